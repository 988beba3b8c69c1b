use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::ProviderError;
use crate::traits::EmbeddingProvider;
use crate::types::{EmbeddingRequest, EmbeddingResponse, EmbeddingTask};

/// Gemini `batchEmbedContents` adapter. Single inputs go through the batch
/// endpoint too.
#[derive(Clone)]
pub struct GeminiEmbeddingProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiEmbeddingProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:batchEmbedContents",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
        )
    }

    const fn task_type(task: Option<EmbeddingTask>) -> Option<&'static str> {
        match task {
            Some(EmbeddingTask::Query) => Some("RETRIEVAL_QUERY"),
            Some(EmbeddingTask::Passage) => Some("RETRIEVAL_DOCUMENT"),
            None => None,
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        if request.inputs.is_empty() {
            return Err(ProviderError::Config(
                "embedding input is empty".to_string(),
            ));
        }

        let model = format!("models/{}", self.config.model);
        let task_type = Self::task_type(request.task);
        let requests = request
            .inputs
            .iter()
            .map(|text| ContentRequest {
                model: &model,
                content: Content {
                    parts: vec![Part { text }],
                },
                task_type,
                output_dimensionality: request.dimensions,
            })
            .collect();

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&BatchBody { requests })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: BatchReply = res.json().await?;
        if parsed.embeddings.len() != request.inputs.len() {
            return Err(ProviderError::VectorCount {
                expected: request.inputs.len(),
                actual: parsed.embeddings.len(),
            });
        }

        Ok(EmbeddingResponse {
            provider: self.name().to_string(),
            model: self.config.model.clone(),
            vectors: parsed.embeddings.into_iter().map(|e| e.values).collect(),
        })
    }
}

#[derive(Debug, Serialize)]
struct BatchBody<'a> {
    requests: Vec<ContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchReply {
    #[serde(default)]
    embeddings: Vec<GeminiVector>,
}

#[derive(Debug, Deserialize)]
struct GeminiVector {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_and_task_type() {
        let req = ContentRequest {
            model: "models/gemini-embedding-001",
            content: Content {
                parts: vec![Part { text: "query: osmosis" }],
            },
            task_type: GeminiEmbeddingProvider::task_type(Some(EmbeddingTask::Query)),
            output_dimensionality: None,
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(json["content"]["parts"][0]["text"], "query: osmosis");
        assert!(json.get("outputDimensionality").is_none());
    }
}
