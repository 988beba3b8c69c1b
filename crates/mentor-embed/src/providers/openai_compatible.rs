use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiCompatibleConfig;
use crate::error::ProviderError;
use crate::traits::EmbeddingProvider;
use crate::types::{EmbeddingRequest, EmbeddingResponse, EmbeddingTask};

/// `/v1/embeddings` adapter for OpenAI and the many services that mirror it.
#[derive(Clone)]
pub struct OpenAiCompatibleEmbeddingProvider {
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleEmbeddingProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn task_name(&self, task: Option<EmbeddingTask>) -> Option<&str> {
        match task? {
            EmbeddingTask::Query => self.config.query_task.as_deref(),
            EmbeddingTask::Passage => self.config.passage_task.as_deref(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/embeddings",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        if request.inputs.is_empty() {
            return Err(ProviderError::Config(
                "embedding input is empty".to_string(),
            ));
        }

        let payload = EmbeddingsBody {
            model: &self.config.model,
            input: &request.inputs,
            dimensions: request.dimensions,
            task: self.task_name(request.task),
        };

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: EmbeddingsReply = res.json().await?;
        vectors_in_order(parsed, request.inputs.len()).map(|(model, vectors)| EmbeddingResponse {
            provider: self.name().to_string(),
            model,
            vectors,
        })
    }
}

fn vectors_in_order(
    parsed: EmbeddingsReply,
    expected: usize,
) -> Result<(String, Vec<Vec<f32>>), ProviderError> {
    if parsed.data.len() != expected {
        return Err(ProviderError::VectorCount {
            expected,
            actual: parsed.data.len(),
        });
    }
    let mut data = parsed.data;
    data.sort_by_key(|it| it.index);
    Ok((
        parsed.model,
        data.into_iter().map(|it| it.embedding).collect(),
    ))
}

#[derive(Debug, Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsReply {
    #[serde(default)]
    model: String,
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_vectors_are_reordered_by_index() {
        let raw = r#"{"model":"m","data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#;
        let parsed: EmbeddingsReply = serde_json::from_str(raw).expect("parse reply");
        let (model, vectors) = vectors_in_order(parsed, 2).expect("vectors");
        assert_eq!(model, "m");
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn short_reply_is_invalid() {
        let raw = r#"{"data":[]}"#;
        let parsed: EmbeddingsReply = serde_json::from_str(raw).expect("parse reply");
        assert!(matches!(
            vectors_in_order(parsed, 1),
            Err(ProviderError::VectorCount { expected: 1, actual: 0 })
        ));
    }

    #[test]
    fn body_omits_unset_fields() {
        let inputs = vec!["query: mitosis".to_string()];
        let body = EmbeddingsBody {
            model: "e5",
            input: &inputs,
            dimensions: None,
            task: None,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json, serde_json::json!({"model": "e5", "input": ["query: mitosis"]}));
    }
}
