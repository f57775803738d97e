pub mod errors;
pub mod refine;
pub mod types;

pub use errors::GenerationError;
pub use refine::{RefineOptions, RefineStats, refine_all, refine_article, refine_jsonl};
pub use types::{GenerationParams, Message, Role};

use async_trait::async_trait;

/// A remote text-generation service. Retries and rate limiting are the
/// implementation's concern.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;
}
