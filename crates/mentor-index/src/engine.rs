use std::sync::Arc;

use mentor_core::CurriculumGate;
use mentor_embed::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::CurriculumChunk;
use crate::error::RetrievalError;
use crate::vector::{VectorIndex, l2_normalize};

pub const DEFAULT_QUERY_PREFIX: &str = "query: ";
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MAX_PASSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitMetadata {
    pub lesson: String,
    pub chapter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub text: String,
    pub score: f32,
    pub metadata: HitMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub top_score: f32,
    pub in_scope: bool,
    /// Best match first.
    pub hits: Vec<RetrievalHit>,
}

/// Embeds queries, searches the index and applies the curriculum gate.
/// Everything it holds is read-only, so clones are shared across tasks.
#[derive(Clone)]
pub struct RetrievalEngine {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    chunks: Arc<Vec<CurriculumChunk>>,
    gate: CurriculumGate,
    query_prefix: String,
}

impl RetrievalEngine {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: VectorIndex,
        chunks: Vec<CurriculumChunk>,
    ) -> Self {
        Self {
            provider,
            index: Arc::new(index),
            chunks: Arc::new(chunks),
            gate: CurriculumGate::default(),
            query_prefix: DEFAULT_QUERY_PREFIX.to_string(),
        }
    }

    pub fn with_gate(mut self, gate: CurriculumGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_query_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.query_prefix = prefix.into();
        self
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RetrievalError> {
        let mut vector = self
            .provider
            .embed_query(&format!("{}{query}", self.query_prefix))
            .await?
            .ok_or(RetrievalError::EmptyEmbedding)?;

        if !self.index.is_empty() && vector.len() != self.index.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: vector.len(),
            });
        }
        l2_normalize(&mut vector);

        let rows = self.index.search(&vector, k);
        let top_score = rows.first().map_or(0.0, |r| r.score);
        let hits = rows
            .iter()
            .filter_map(|scored| {
                let chunk = self.chunks.get(scored.row)?;
                Some(RetrievalHit {
                    text: chunk.text.clone(),
                    score: scored.score,
                    metadata: HitMetadata {
                        lesson: chunk.lesson_or_unknown().to_string(),
                        chapter: chunk.chapter_or_unknown().to_string(),
                    },
                })
            })
            .collect::<Vec<_>>();

        let in_scope = self.gate.admits(top_score);
        debug!(top_score, in_scope, hits = hits.len(), "retrieval finished");
        Ok(RetrievalResult {
            top_score,
            in_scope,
            hits,
        })
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_passage(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", text.get(..byte).unwrap_or(text)),
        None => text.to_string(),
    }
}
