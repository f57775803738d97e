//! Pattern rules consulted by the normalizer.
//!
//! Rules are plain data ([`PatternRule`]) compiled into a [`RuleSet`]. The
//! set keeps one ordered list per [`RuleKind`]; the normalizer never needs to
//! know which concrete rules exist, so callers can append their own without
//! touching it.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::cleaner::errors::CleanerError;

const AMAZON_URL: &str = r#"https?://(?:www\.)?amazon\.(?:[a-z.]{2,6})/[^\s"'<]+"#;
const ASIN_DETAIL: &str = r"\[asin:[^\]]+:detail\]";
const AMAZON_ANCHOR: &str =
    r#"<a\s[^>]*href=["']https?://(?:www\.)?amazon\.(?:[a-z.]{2,6})/[^\s"']+["']"#;
const CAPTION_BLOCK: &str = r"\[caption\b[^\]]*\].*?\[/caption\]";
const ANY_SHORTCODE: &str = r"\[/?\w+.*?\]";

static STANDARD_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::from_rules(&standard_rules()).expect("built-in rules must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Any match anywhere in a paragraph discards the whole paragraph.
    RejectParagraph,
    /// Matches are replaced (deleted by default); the paragraph is kept.
    StripSpan,
    /// Cleaned lines matching the pattern are removed from their paragraph.
    DropLine,
    /// A paragraph whose first line matches is dropped. A heading standing
    /// alone also takes the next paragraph with it.
    DropSection,
}

/// A single pattern rule as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub kind: RuleKind,
    pub pattern: String,
    #[serde(default)]
    pub case_insensitive: bool,
    /// Lets `.` match newlines so a pattern can span lines of a paragraph.
    #[serde(default)]
    pub dot_matches_newline: bool,
    /// Replacement template for [`RuleKind::StripSpan`] rules. Supports `$1`
    /// style capture references.
    #[serde(default)]
    pub replacement: String,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, kind: RuleKind, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            pattern: pattern.into(),
            case_insensitive: false,
            dot_matches_newline: false,
            replacement: String::new(),
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn across_lines(mut self) -> Self {
        self.dot_matches_newline = true;
        self
    }

    pub fn replace_with(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }

    pub fn compile(&self) -> Result<CompiledRule, CleanerError> {
        let regex = RegexBuilder::new(&self.pattern)
            .case_insensitive(self.case_insensitive)
            .dot_matches_new_line(self.dot_matches_newline)
            .build()
            .map_err(|source| CleanerError::InvalidPattern {
                name: self.name.clone(),
                source,
            })?;

        Ok(CompiledRule {
            name: self.name.clone(),
            kind: self.kind,
            regex,
            replacement: self.replacement.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    name: String,
    kind: RuleKind,
    regex: Regex,
    replacement: String,
}

impl CompiledRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn deletes(&self) -> bool {
        self.replacement.is_empty()
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.regex.replace_all(text, self.replacement.as_str())
    }
}

/// Ordered, immutable-once-built collection of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    reject: Vec<CompiledRule>,
    strip: Vec<CompiledRule>,
    drop_line: Vec<CompiledRule>,
    sections: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn from_rules(rules: &[PatternRule]) -> Result<Self, CleanerError> {
        let mut set = Self::default();
        for rule in rules {
            set.push(rule)?;
        }
        Ok(set)
    }

    /// Affiliate rejection plus caption stripping.
    pub fn standard() -> Self {
        STANDARD_RULES.clone()
    }

    /// Appends a rule after every existing rule of the same kind.
    pub fn push(&mut self, rule: &PatternRule) -> Result<(), CleanerError> {
        let compiled = rule.compile()?;
        match compiled.kind {
            RuleKind::RejectParagraph => self.reject.push(compiled),
            RuleKind::StripSpan => self.strip.push(compiled),
            RuleKind::DropLine => self.drop_line.push(compiled),
            RuleKind::DropSection => self.sections.push(compiled),
        }
        Ok(())
    }

    pub fn extend(&mut self, rules: &[PatternRule]) -> Result<(), CleanerError> {
        rules.iter().try_for_each(|rule| self.push(rule))
    }

    /// Appends rules from a JSON array of [`PatternRule`] objects.
    pub fn extend_from_json(&mut self, json: &str) -> Result<(), CleanerError> {
        let rules: Vec<PatternRule> = serde_json::from_str(json)?;
        self.extend(&rules)
    }

    /// First reject rule matching the paragraph, if any.
    pub fn rejecting_rule(&self, paragraph: &str) -> Option<&CompiledRule> {
        self.reject.iter().find(|rule| rule.is_match(paragraph))
    }

    pub fn section_rule(&self, line: &str) -> Option<&CompiledRule> {
        self.sections.iter().find(|rule| rule.is_match(line))
    }

    /// Applies every strip rule in order, each over the previous output.
    pub fn strip_spans(&self, text: &str) -> String {
        self.strip
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc).into_owned())
    }

    /// True when every strip rule deletes its matches, so repeated stripping
    /// only ever shortens the text.
    pub fn strips_only_delete(&self) -> bool {
        self.strip.iter().all(CompiledRule::deletes)
    }

    pub fn drops_line(&self, line: &str) -> bool {
        self.drop_line.iter().any(|rule| rule.is_match(line))
    }

    pub fn len(&self) -> usize {
        self.reject.len() + self.strip.len() + self.drop_line.len() + self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paragraph-reject rules for Amazon referral content.
pub fn affiliate_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new("amazon_url", RuleKind::RejectParagraph, AMAZON_URL).case_insensitive(),
        PatternRule::new("asin_detail", RuleKind::RejectParagraph, ASIN_DETAIL).case_insensitive(),
        PatternRule::new("amazon_anchor", RuleKind::RejectParagraph, AMAZON_ANCHOR)
            .case_insensitive(),
    ]
}

pub fn caption_rule() -> PatternRule {
    PatternRule::new("caption", RuleKind::StripSpan, CAPTION_BLOCK)
        .case_insensitive()
        .across_lines()
}

/// Strips any `[name ...]` or `[/name]` directive. Opt-in: it also eats
/// bracketed text such as footnote markers.
pub fn any_shortcode_rule() -> PatternRule {
    PatternRule::new("any_shortcode", RuleKind::StripSpan, ANY_SHORTCODE)
}

pub fn standard_rules() -> Vec<PatternRule> {
    let mut rules = affiliate_rules();
    rules.push(caption_rule());
    rules
}
