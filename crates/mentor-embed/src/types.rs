/// Which side of a retrieval pair a text is embedded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Query,
    Passage,
}

#[derive(Debug, Clone)]
pub struct EmbeddingRequest {
    pub inputs: Vec<String>,
    pub task: Option<EmbeddingTask>,
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    pub fn query(input: impl Into<String>) -> Self {
        Self {
            inputs: vec![input.into()],
            task: Some(EmbeddingTask::Query),
            dimensions: None,
        }
    }

    pub fn passages(inputs: Vec<String>) -> Self {
        Self {
            inputs,
            task: Some(EmbeddingTask::Passage),
            dimensions: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub provider: String,
    pub model: String,
    /// One vector per input, in input order.
    pub vectors: Vec<Vec<f32>>,
}

impl EmbeddingResponse {
    pub fn into_first(self) -> Option<Vec<f32>> {
        self.vectors.into_iter().next().filter(|v| !v.is_empty())
    }
}
