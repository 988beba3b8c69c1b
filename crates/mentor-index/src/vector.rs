use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs;
use std::path::Path;

use mentor_embed::{EmbeddingProvider, EmbeddingRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::CurriculumChunk;
use crate::error::IndexError;

pub const DEFAULT_BUILD_BATCH: usize = 32;

/// Flat, exact inner-product index. Vectors are expected to be unit length,
/// so scores are cosine similarities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let index = Self { dimension, vectors };
        index.validate()?;
        Ok(index)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let bytes = fs::read(path.as_ref())?;
        let index: Self = serde_json::from_slice(&bytes)?;
        index.validate()?;
        Ok(index)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let bytes = serde_json::to_vec(self)?;
        fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Embeds every chunk as a passage, `batch_size` texts per provider call.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        chunks: &[CurriculumChunk],
        batch_size: usize,
    ) -> Result<Self, IndexError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size.max(1)) {
            let inputs = batch.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
            let response = provider.embed(EmbeddingRequest::passages(inputs)).await?;
            if response.vectors.len() != batch.len() {
                return Err(IndexError::Invalid(format!(
                    "provider returned {} vectors for {} passages",
                    response.vectors.len(),
                    batch.len()
                )));
            }
            vectors.extend(response.vectors.into_iter().map(|mut v| {
                l2_normalize(&mut v);
                v
            }));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        info!(
            provider = provider.name(),
            rows = vectors.len(),
            dimension,
            "built vector index"
        );
        Self::new(dimension, vectors)
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Top `k` rows by inner product, best first. Equal scores keep row order.
    /// The caller guarantees `query.len() == self.dimension()`.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredRow> {
        if k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (row, vector) in self.vectors.iter().enumerate() {
            heap.push(Reverse(ScoredRow {
                row,
                score: dot(query, vector),
            }));
            if heap.len() > k {
                heap.pop();
            }
        }

        // Ascending on Reverse means best-first on the inner value.
        heap.into_sorted_vec().into_iter().map(|Reverse(r)| r).collect()
    }

    fn validate(&self) -> Result<(), IndexError> {
        if let Some((row, v)) = self
            .vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != self.dimension)
        {
            return Err(IndexError::Invalid(format!(
                "row {row} has dimension {}, expected {}",
                v.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredRow {
    pub row: usize,
    pub score: f32,
}

impl PartialEq for ScoredRow {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredRow {}

impl PartialOrd for ScoredRow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredRow {
    // Higher score ranks higher; on ties the earlier row ranks higher.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.row.cmp(&self.row))
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
