use thiserror::Error;

/// Failures talking to a chat completion backend.
///
/// The inference client never surfaces these to students; it maps them to a
/// [`FailureReason`](crate::FailureReason) and answers with its fallback text.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("chat provider misconfigured: {0}")]
    Config(String),

    #[error("chat transport failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat payload could not be decoded: {0}")]
    Serde(#[from] serde_json::Error),

    /// The backend answered 2xx but without a first choice carrying text.
    #[error("chat completion has no message content")]
    EmptyCompletion,

    #[error("chat provider answered with status {status}: {body}")]
    Api { status: u16, body: String },
}
