use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation backend error: {0}")]
    Backend(String),

    #[error("generation timed out")]
    Timeout,

    #[error("empty completion")]
    EmptyCompletion,

    #[error("generation task failed: {0}")]
    Task(String),
}
