//! Editorial rules applied before an article is handed to generation.
//!
//! These target the blog's recurring furniture: related-article blocks,
//! reaction round-ups, tables of contents, store and embed title lines.

use crate::cleaner::errors::CleanerError;
use crate::cleaner::rules::{PatternRule, RuleKind, RuleSet};

pub fn section_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            "related_articles",
            RuleKind::DropSection,
            r"^(?:関連記事|関連する記事|■関連記事)$",
        ),
        PatternRule::new(
            "overseas_reactions",
            RuleKind::DropSection,
            r"^(?:海外での\s*Twitter\s*の反応|海外の反応)$",
        )
        .case_insensitive(),
        PatternRule::new(
            "table_of_contents",
            RuleKind::DropSection,
            r"^(?:目次|この記事の目次)$",
        ),
    ]
}

pub fn line_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new("citation", RuleKind::DropLine, r"^引用元\s*[:：]"),
        PatternRule::new("amazon_listing", RuleKind::DropLine, r"^Amazon\s*\|").case_insensitive(),
        PatternRule::new(
            "amazon_store",
            RuleKind::DropLine,
            r"(?:通販\s*\|\s*Amazon|Amazon\s*で見る)$",
        )
        .case_insensitive(),
        PatternRule::new(
            "amazon_anchor_line",
            RuleKind::DropLine,
            r"^<a href=.*amazon\.co\.jp.*</a>$",
        )
        .case_insensitive(),
        PatternRule::new("youtube_title", RuleKind::DropLine, r"YouTube$").case_insensitive(),
        PatternRule::new("official_site", RuleKind::DropLine, r"^映画「.*?」公式サイト.*公開$"),
    ]
}

/// Removes the spaces markup leaves around the author's own handle.
pub fn mention_spacing_rule(handle: &str) -> Result<PatternRule, CleanerError> {
    let name = handle.trim().trim_start_matches('@');
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(CleanerError::InvalidHandle(handle.to_string()));
    }
    Ok(PatternRule::new(
        "mention_spacing",
        RuleKind::StripSpan,
        format!(r"[ \t]*(@{})[ \t]*", regex::escape(name)),
    )
    .replace_with("$1"))
}

/// Standard rules followed by the editorial ones.
pub fn editorial_rules(base: &RuleSet, handle: Option<&str>) -> Result<RuleSet, CleanerError> {
    let mut rules = base.clone();
    rules.extend(&section_rules())?;
    rules.extend(&line_rules())?;
    if let Some(handle) = handle {
        rules.push(&mention_spacing_rule(handle)?)?;
    }
    Ok(rules)
}
