use std::time::Duration;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";

/// Connection settings for an OpenAI-compatible `/v1/chat/completions` API.
#[derive(Debug, Clone)]
pub struct ChatProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ChatProviderConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GROQ_BASE_URL.to_string(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }
}
