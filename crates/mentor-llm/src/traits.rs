use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ChatRequest, ChatResponse};

/// One chat completion round trip against a hosted model.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
