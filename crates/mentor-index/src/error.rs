use mentor_embed::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid index: {0}")]
    Invalid(String),
    #[error("embedding failed while building index: {0}")]
    Provider(#[from] ProviderError),
}

/// Failure of a single retrieval. Callers answer the client; nothing here
/// is fatal to the service.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("embedding provider returned no vector")]
    EmptyEmbedding,
    #[error("query vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
