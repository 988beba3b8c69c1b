use std::sync::Arc;

use crate::config::EmbeddingProviderConfig;
use crate::error::ProviderError;
use crate::providers::{GeminiEmbeddingProvider, OpenAiCompatibleEmbeddingProvider};
use crate::traits::EmbeddingProvider;

pub fn build_embedding_provider(
    cfg: EmbeddingProviderConfig,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    if cfg.api_key().trim().is_empty() {
        return Err(ProviderError::Config(
            "embedding api key is empty".to_string(),
        ));
    }
    match cfg {
        EmbeddingProviderConfig::OpenAiCompatible(c) => {
            Ok(Arc::new(OpenAiCompatibleEmbeddingProvider::new(c)?))
        }
        EmbeddingProviderConfig::Gemini(c) => Ok(Arc::new(GeminiEmbeddingProvider::new(c)?)),
    }
}
