use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::traits::ChatProvider;
use crate::types::{ChatMessage, ChatRequest, SamplingConfig};

pub const DEFAULT_FALLBACK: &str =
    "I ran into a technical issue. Please try asking your question again.";

/// Why a completion could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Network,
    Timeout,
    Auth,
    RateLimited,
    Api { status: u16 },
    MalformedResponse,
    Config,
}

impl FailureReason {
    pub fn classify(err: &ProviderError) -> Self {
        match err {
            ProviderError::Http(e) if e.is_timeout() => Self::Timeout,
            ProviderError::Http(e) if e.is_decode() => Self::MalformedResponse,
            ProviderError::Http(_) => Self::Network,
            ProviderError::Api { status: 401 | 403, .. } => Self::Auth,
            ProviderError::Api { status: 429, .. } => Self::RateLimited,
            ProviderError::Api { status, .. } => Self::Api { status: *status },
            ProviderError::Serde(_) | ProviderError::EmptyCompletion => Self::MalformedResponse,
            ProviderError::Config(_) => Self::Config,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network error"),
            Self::Timeout => f.write_str("provider timed out"),
            Self::Auth => f.write_str("provider rejected credentials"),
            Self::RateLimited => f.write_str("provider rate limit reached"),
            Self::Api { status } => write!(f, "provider returned status {status}"),
            Self::MalformedResponse => f.write_str("malformed provider response"),
            Self::Config => f.write_str("provider is misconfigured"),
        }
    }
}

/// Outcome of one inference call. Never an error: failures carry the
/// user-safe fallback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Generated(String),
    Fallback { reason: FailureReason, text: String },
}

impl Completion {
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) | Self::Fallback { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text) | Self::Fallback { text, .. } => text,
        }
    }

    pub const fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Sends message sequences to a [`ChatProvider`] with fixed sampling and
/// converts every provider failure into [`Completion::Fallback`].
#[derive(Clone)]
pub struct InferenceClient {
    provider: Arc<dyn ChatProvider>,
    sampling: SamplingConfig,
    fallback: String,
    secrets: Vec<String>,
}

impl InferenceClient {
    pub fn new(provider: Arc<dyn ChatProvider>, sampling: SamplingConfig) -> Self {
        Self {
            provider,
            sampling,
            fallback: DEFAULT_FALLBACK.to_string(),
            secrets: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Strings scrubbed from logged provider errors.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Completion {
        let request = ChatRequest {
            messages,
            sampling: self.sampling.clone(),
        };
        match self.provider.complete(request).await {
            Ok(response) => {
                let text = response.content.trim();
                if text.is_empty() {
                    warn!(provider = self.provider.name(), "completion was empty");
                    return self.fallback(FailureReason::MalformedResponse);
                }
                debug!(
                    provider = %response.provider,
                    model = %response.model,
                    chars = text.len(),
                    "completion received"
                );
                Completion::Generated(text.to_string())
            }
            Err(err) => {
                let reason = FailureReason::classify(&err);
                warn!(
                    provider = self.provider.name(),
                    %reason,
                    error = %self.scrub(&err.to_string()),
                    "completion failed, using fallback"
                );
                self.fallback(reason)
            }
        }
    }

    fn fallback(&self, reason: FailureReason) -> Completion {
        Completion::Fallback {
            reason,
            text: self.fallback.clone(),
        }
    }

    fn scrub(&self, message: &str) -> String {
        self.secrets
            .iter()
            .fold(message.to_string(), |acc, secret| acc.replace(secret.as_str(), "[REDACTED]"))
    }
}
