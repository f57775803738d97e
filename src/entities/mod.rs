use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Columns a post export must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = ["ID", "post_title", "post_content", "post_date", "category"];

/// --- Inputs ---

/// One row of a blog post CSV export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "post_title")]
    pub title: String,
    #[serde(rename = "post_content")]
    pub content: String,
    pub post_date: String,
    pub category: String,
}

/// A JSONL article as produced by `convert`, read leniently: any field may
/// be missing or hold the wrong type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArticleRecord {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub text: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArticleRecord {
    pub fn title_str(&self) -> Option<&str> {
        self.title.as_str()
    }

    pub fn text_str(&self) -> Option<&str> {
        self.text.as_str()
    }
}

/// --- Outputs ---

/// Field order is the output key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub id: String,
    pub title: String,
    pub text: String,
    pub category: String,
    pub post_date: String,
}

impl CleanRecord {
    /// Trims the metadata fields and stores already-cleaned body text.
    pub fn from_row(row: &PostRow, text: String) -> Self {
        Self {
            id: row.id.trim().to_string(),
            title: row.title.trim().to_string(),
            text,
            category: row.category.trim().to_string(),
            post_date: row.post_date.trim().to_string(),
        }
    }
}

/// An article after the generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedRecord {
    pub id: Value,
    pub title: String,
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
