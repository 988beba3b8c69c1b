use std::time::Duration;

use crate::error::ProviderError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_EMBED_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_GEMINI_EMBED_MODEL: &str = "gemini-embedding-001";
const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(15);

/// Any server speaking the `/v1/embeddings` wire format.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Provider-specific `task` values, e.g. `retrieval.query` on Jina.
    pub query_task: Option<String>,
    pub passage_task: Option<String>,
}

impl OpenAiCompatibleConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            timeout: DEFAULT_EMBED_TIMEOUT,
            query_task: None,
            passage_task: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
            timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EmbeddingProviderConfig {
    OpenAiCompatible(OpenAiCompatibleConfig),
    Gemini(GeminiConfig),
}

impl EmbeddingProviderConfig {
    /// Builds a config from a provider name (`openai-compatible`, `openai`
    /// or `gemini`). Missing model and base URL fall back to the provider's
    /// defaults.
    pub fn named(
        provider: &str,
        api_key: impl Into<String>,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ProviderError> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "openai-compatible" | "openai" => {
                let mut cfg = OpenAiCompatibleConfig::new(
                    api_key,
                    model.unwrap_or_else(|| DEFAULT_OPENAI_EMBED_MODEL.to_string()),
                );
                if let Some(base_url) = base_url {
                    cfg = cfg.with_base_url(base_url);
                }
                Ok(Self::OpenAiCompatible(cfg))
            }
            "gemini" => {
                let mut cfg = GeminiConfig::new(
                    api_key,
                    model.unwrap_or_else(|| DEFAULT_GEMINI_EMBED_MODEL.to_string()),
                );
                if let Some(base_url) = base_url {
                    cfg.base_url = base_url;
                }
                Ok(Self::Gemini(cfg))
            }
            other => Err(ProviderError::Config(format!(
                "unknown embedding provider {other:?}"
            ))),
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            Self::OpenAiCompatible(c) => &c.api_key,
            Self::Gemini(c) => &c.api_key,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAiCompatible(c) => &c.model,
            Self::Gemini(c) => &c.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_applies_provider_defaults() {
        let cfg = EmbeddingProviderConfig::named("OpenAI", "k", None, None).expect("openai");
        assert_eq!(cfg.model(), DEFAULT_OPENAI_EMBED_MODEL);
        assert!(matches!(
            &cfg,
            EmbeddingProviderConfig::OpenAiCompatible(c) if c.base_url == OPENAI_BASE_URL
        ));

        let cfg = EmbeddingProviderConfig::named(
            "gemini",
            "k",
            Some("text-embedding-004".to_string()),
            Some("http://localhost:9000".to_string()),
        )
        .expect("gemini");
        assert_eq!(cfg.model(), "text-embedding-004");
        assert!(matches!(
            &cfg,
            EmbeddingProviderConfig::Gemini(c) if c.base_url == "http://localhost:9000"
        ));

        assert!(matches!(
            EmbeddingProviderConfig::named("word2vec", "k", None, None),
            Err(ProviderError::Config(_))
        ));
    }
}
