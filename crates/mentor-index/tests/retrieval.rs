use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mentor_core::CurriculumGate;
use mentor_embed::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingTask, ProviderError};
use mentor_index::{CurriculumChunk, RetrievalEngine, RetrievalError, VectorIndex};

/// Maps a handful of known texts onto fixed 3-d directions.
struct KeywordEmbedder {
    calls: AtomicUsize,
    seen: Mutex<Vec<(EmbeddingTask, String)>>,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn vector_for(text: &str) -> Vec<f32> {
        let t = text.to_lowercase();
        if t.contains("mitosis") {
            vec![2.0, 0.0, 0.0]
        } else if t.contains("photosynthesis") {
            vec![0.0, 3.0, 0.0]
        } else if t.contains("cells") {
            vec![0.9, 0.1, 0.0]
        } else {
            vec![0.0, 0.0, 1.0]
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let task = request.task.unwrap_or(EmbeddingTask::Passage);
        self.seen
            .lock()
            .expect("lock")
            .extend(request.inputs.iter().map(|i| (task, i.clone())));
        Ok(EmbeddingResponse {
            provider: "keyword".to_string(),
            model: "fixed".to_string(),
            vectors: request.inputs.iter().map(|i| Self::vector_for(i)).collect(),
        })
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::Api {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

fn chunks() -> Vec<CurriculumChunk> {
    vec![
        CurriculumChunk {
            text: "Mitosis produces two identical cells.".to_string(),
            lesson: Some("Cell Division".to_string()),
            chapter: Some("Biology".to_string()),
        },
        CurriculumChunk {
            text: "Photosynthesis turns light into sugar.".to_string(),
            lesson: Some("Plants".to_string()),
            chapter: None,
        },
        CurriculumChunk {
            text: "Unrelated trivia about football.".to_string(),
            lesson: None,
            chapter: None,
        },
    ]
}

#[tokio::test]
async fn builds_index_in_batches_and_retrieves_in_scope() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let corpus = chunks();
    let index = VectorIndex::build(embedder.as_ref(), &corpus, 2)
        .await
        .expect("build");
    assert_eq!(index.len(), 3);
    assert_eq!(index.dimension(), 3);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

    let engine = RetrievalEngine::new(embedder.clone(), index, corpus);
    let result = engine.retrieve("What is mitosis?", 3).await.expect("retrieve");

    assert!(result.in_scope);
    assert!((result.top_score - 1.0).abs() < 1e-6);
    assert_eq!(result.hits.len(), 3);
    assert_eq!(result.hits[0].metadata.lesson, "Cell Division");
    assert!(result.hits[0].score >= result.hits[1].score);
    assert_eq!(result.hits[1].metadata.chapter, "Unknown");

    let log = embedder.seen.lock().expect("lock").clone();
    let (task, input) = log.last().expect("query logged");
    assert_eq!(*task, EmbeddingTask::Query);
    assert_eq!(input, "query: What is mitosis?");
}

#[tokio::test]
async fn weak_match_is_out_of_scope() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let corpus = chunks();
    let index = VectorIndex::build(embedder.as_ref(), &corpus, 32)
        .await
        .expect("build");
    // "cells" lands at roughly 0.994 against mitosis, so a stricter gate rejects it.
    let engine = RetrievalEngine::new(embedder, index, corpus)
        .with_gate(CurriculumGate::new(0.999))
        .with_query_prefix("");
    let result = engine.retrieve("tell me about cells", 1).await.expect("retrieve");
    assert!(!result.in_scope);
    assert_eq!(result.hits.len(), 1);
}

#[tokio::test]
async fn rows_beyond_corpus_are_skipped_but_still_scored() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let index = VectorIndex::new(
        3,
        vec![vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]],
    )
    .expect("index");
    let corpus = vec![CurriculumChunk {
        text: "Trivia".to_string(),
        lesson: None,
        chapter: None,
    }];
    let engine = RetrievalEngine::new(embedder, index, corpus);
    let result = engine.retrieve("mitosis", 2).await.expect("retrieve");
    assert!((result.top_score - 1.0).abs() < 1e-6);
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].text, "Trivia");
}

#[tokio::test]
async fn empty_index_scores_zero() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let index = VectorIndex::new(3, Vec::new()).expect("index");
    let engine = RetrievalEngine::new(embedder, index, Vec::new());
    let result = engine.retrieve("mitosis", 3).await.expect("retrieve");
    assert_eq!(result.top_score, 0.0);
    assert!(!result.in_scope);
    assert!(result.hits.is_empty());
}

#[tokio::test]
async fn provider_and_dimension_failures_are_typed() {
    let index = VectorIndex::new(2, vec![vec![1.0, 0.0]]).expect("index");
    let engine = RetrievalEngine::new(Arc::new(FailingEmbedder), index.clone(), chunks());
    assert!(matches!(
        engine.retrieve("mitosis", 3).await,
        Err(RetrievalError::Provider(_))
    ));

    let engine = RetrievalEngine::new(Arc::new(KeywordEmbedder::new()), index, chunks());
    assert!(matches!(
        engine.retrieve("mitosis", 3).await,
        Err(RetrievalError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
}
