use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ChatProviderConfig;
use crate::error::ProviderError;
use crate::traits::ChatProvider;
use crate::types::{ChatMessage, ChatRequest, ChatResponse};

/// Chat completions over the OpenAI wire format (OpenAI, Groq, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiCompatibleChatProvider {
    config: ChatProviderConfig,
    client: Client,
}

impl OpenAiCompatibleChatProvider {
    pub fn new(config: ChatProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiCompatibleChatProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        if request.messages.is_empty() {
            return Err(ProviderError::Config("chat messages are empty".to_string()));
        }

        let body = CompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: request.sampling.max_tokens,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            presence_penalty: request.sampling.presence_penalty,
            frequency_penalty: request.sampling.frequency_penalty,
        };

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: CompletionReply = res.json().await?;
        let model = parsed.model.clone();
        let content = first_choice_text(parsed)?;
        Ok(ChatResponse {
            provider: self.name().to_string(),
            model: model.unwrap_or_else(|| self.config.model.clone()),
            content,
        })
    }
}

fn first_choice_text(reply: CompletionReply) -> Result<String, ProviderError> {
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ProviderError::EmptyCompletion)
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}
