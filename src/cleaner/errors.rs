use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("invalid pattern for rule '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid mention handle '{0}'")]
    InvalidHandle(String),

    #[error("cannot read rules file {path}: {source}")]
    RulesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rules: {0}")]
    MalformedRules(#[from] serde_json::Error),
}
