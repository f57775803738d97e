//! Configuration handling for the cleaning and generation passes.
//!
//! Everything is read from environment variables with development defaults.
//! `Config::from_env` resolves optional values once (for example the
//! fine-tuned model id, which falls back to the default model) so no caller
//! has to probe for them later.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cleaner::html::DEFAULT_AFFILIATE_SELECTORS;
use crate::generation::GenerationParams;

pub const ENV_DEFAULT_MODEL: &str = "POSTCLEAN_DEFAULT_MODEL";
pub const ENV_FINETUNED_MODEL: &str = "POSTCLEAN_FINETUNED_MODEL";
pub const ENV_TEMPERATURE: &str = "POSTCLEAN_TEMPERATURE";
pub const ENV_MAX_TOKENS: &str = "POSTCLEAN_MAX_TOKENS";
pub const ENV_TOP_P: &str = "POSTCLEAN_TOP_P";
pub const ENV_MENTION_HANDLE: &str = "POSTCLEAN_MENTION_HANDLE";
pub const ENV_AFFILIATE_SELECTORS: &str = "POSTCLEAN_AFFILIATE_SELECTORS";
pub const ENV_STRIP_ALL_SHORTCODES: &str = "POSTCLEAN_STRIP_ALL_SHORTCODES";
pub const ENV_RULES_FILE: &str = "POSTCLEAN_RULES_FILE";
pub const ENV_GENERATION_CONCURRENCY: &str = "POSTCLEAN_GENERATION_CONCURRENCY";

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TOP_P: f32 = 1.0;
const DEFAULT_GENERATION_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    default_model: String,
    finetuned_model: Option<String>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    mention_handle: Option<String>,
    affiliate_selectors: Vec<String>,
    strip_all_shortcodes: bool,
    rules_file: Option<PathBuf>,
    generation_concurrency: usize,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_model = optional(ENV_DEFAULT_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let finetuned_model = optional(ENV_FINETUNED_MODEL);
        let temperature = parsed(ENV_TEMPERATURE, DEFAULT_TEMPERATURE)?;
        let max_tokens = parsed(ENV_MAX_TOKENS, DEFAULT_MAX_TOKENS)?;
        let top_p = parsed(ENV_TOP_P, DEFAULT_TOP_P)?;
        let mention_handle = optional(ENV_MENTION_HANDLE);
        let affiliate_selectors = match optional(ENV_AFFILIATE_SELECTORS) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => default_selectors(),
        };
        let strip_all_shortcodes = parsed(ENV_STRIP_ALL_SHORTCODES, false)?;
        let rules_file = optional(ENV_RULES_FILE).map(PathBuf::from);
        let generation_concurrency =
            parsed(ENV_GENERATION_CONCURRENCY, DEFAULT_GENERATION_CONCURRENCY)?;

        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                field: ENV_TEMPERATURE,
                reason: format!("{temperature} is outside 0.0..=2.0"),
            });
        }
        if !(0.0..=1.0).contains(&top_p) {
            return Err(ConfigError::InvalidValue {
                field: ENV_TOP_P,
                reason: format!("{top_p} is outside 0.0..=1.0"),
            });
        }
        if generation_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_GENERATION_CONCURRENCY,
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            default_model,
            finetuned_model,
            temperature,
            max_tokens,
            top_p,
            mention_handle,
            affiliate_selectors,
            strip_all_shortcodes,
            rules_file,
            generation_concurrency,
        })
    }

    pub fn with_finetuned_model(mut self, model: impl Into<String>) -> Self {
        self.finetuned_model = Some(model.into());
        self
    }

    pub fn with_mention_handle(mut self, handle: impl Into<String>) -> Self {
        self.mention_handle = Some(handle.into());
        self
    }

    pub fn with_rules_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_file = Some(path.into());
        self
    }

    pub fn with_strip_all_shortcodes(mut self, enabled: bool) -> Self {
        self.strip_all_shortcodes = enabled;
        self
    }

    /// The fine-tuned model when one is configured, the default model otherwise.
    pub fn model(&self) -> &str {
        self.finetuned_model.as_deref().unwrap_or(&self.default_model)
    }

    pub fn finetuned_model(&self) -> Option<&str> {
        self.finetuned_model.as_deref()
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model().to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    pub fn mention_handle(&self) -> Option<&str> {
        self.mention_handle.as_deref()
    }

    pub fn affiliate_selectors(&self) -> &[String] {
        &self.affiliate_selectors
    }

    pub fn strip_all_shortcodes(&self) -> bool {
        self.strip_all_shortcodes
    }

    pub fn rules_file(&self) -> Option<&Path> {
        self.rules_file.as_deref()
    }

    pub fn generation_concurrency(&self) -> usize {
        self.generation_concurrency
    }
}

impl Default for Config {
    /// Development defaults (mirrors `from_env` with no env overrides).
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            finetuned_model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            mention_handle: None,
            affiliate_selectors: default_selectors(),
            strip_all_shortcodes: false,
            rules_file: None,
            generation_concurrency: DEFAULT_GENERATION_CONCURRENCY,
        }
    }
}

fn default_selectors() -> Vec<String> {
    DEFAULT_AFFILIATE_SELECTORS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Unset and blank variables are both treated as absent.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: key,
            reason: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}
