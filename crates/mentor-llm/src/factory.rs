use std::sync::Arc;

use crate::config::ChatProviderConfig;
use crate::error::ProviderError;
use crate::providers::OpenAiCompatibleChatProvider;
use crate::traits::ChatProvider;

pub fn build_chat_provider(cfg: ChatProviderConfig) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    if cfg.api_key.trim().is_empty() {
        return Err(ProviderError::Config("chat api key is empty".to_string()));
    }
    if cfg.model.trim().is_empty() {
        return Err(ProviderError::Config("chat model is empty".to_string()));
    }
    Ok(Arc::new(OpenAiCompatibleChatProvider::new(cfg)?))
}
