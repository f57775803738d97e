pub mod boilerplate;
pub mod errors;
pub mod html;
pub mod normalizer;
pub mod rules;

#[cfg(test)]
mod tests;

pub use errors::CleanerError;
pub use html::{HtmlExtractor, MentionRule};
pub use normalizer::{LineMode, normalize, normalize_with};
pub use rules::{PatternRule, RuleKind, RuleSet, any_shortcode_rule};

use std::fs;

use serde_json::Value;
use tracing::debug;

use crate::config::Config;

/// HTML extraction and text normalization behind one configured value.
#[derive(Debug, Clone)]
pub struct Cleaner {
    rules: RuleSet,
    extractor: HtmlExtractor,
}

impl Cleaner {
    pub fn new(rules: RuleSet, extractor: HtmlExtractor) -> Self {
        Self { rules, extractor }
    }

    pub fn from_config(config: &Config) -> Result<Self, CleanerError> {
        let mut rules = RuleSet::standard();
        if config.strip_all_shortcodes() {
            rules.push(&any_shortcode_rule())?;
        }
        if let Some(path) = config.rules_file() {
            let json = fs::read_to_string(path).map_err(|source| CleanerError::RulesFile {
                path: path.to_path_buf(),
                source,
            })?;
            rules.extend_from_json(&json)?;
            debug!(path = %path.display(), rules = rules.len(), "loaded extra rules");
        }

        let mention = match config.mention_handle() {
            Some(handle) => MentionRule::for_handle(handle)?,
            None => MentionRule::any_handle(),
        };
        let extractor =
            HtmlExtractor::new(config.affiliate_selectors())?.with_mention(Some(mention));

        Ok(Self { rules, extractor })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Post body HTML to clean paragraphs.
    pub fn clean_html(&self, html: &str) -> String {
        let text = self.extractor.extract(html);
        normalize_with(&text, &self.rules, LineMode::Collapse)
    }

    pub fn clean_text(&self, text: &str) -> String {
        normalize(text, &self.rules)
    }

    /// Cleans a JSON field that should hold text. Anything else becomes "".
    pub fn clean_value(&self, value: Option<&Value>) -> String {
        match value {
            Some(Value::String(text)) => self.clean_text(text),
            _ => String::new(),
        }
    }

    /// This cleaner's rules plus the editorial boilerplate rules.
    pub fn editorial_rules(&self, handle: Option<&str>) -> Result<RuleSet, CleanerError> {
        boilerplate::editorial_rules(&self.rules, handle)
    }
}

impl Default for Cleaner {
    /// Standard rules with the default affiliate selectors.
    fn default() -> Self {
        Self {
            rules: RuleSet::standard(),
            extractor: HtmlExtractor::default(),
        }
    }
}
