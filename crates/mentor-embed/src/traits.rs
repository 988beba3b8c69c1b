use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// Turns text into vectors. Implementations are shared across connection
/// tasks, so they must be `Send + Sync`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError>;

    /// Embeds one search query. `None` when the provider answered without a
    /// usable vector.
    async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        let response = self.embed(EmbeddingRequest::query(text)).await?;
        Ok(response.into_first())
    }
}
