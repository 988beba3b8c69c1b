#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mentor_embed::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use mentor_index::{CurriculumChunk, RetrievalEngine, VectorIndex};
use mentor_llm::{ChatMessage, ChatProvider, ChatRequest, ChatResponse, ProviderError};
use mentor_server::{ConnectionHandler, Listener, ShutdownHandle};

static SEQ: AtomicU64 = AtomicU64::new(0);

pub fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "mentor-server-{tag}-{}-{}.json",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Topic words map to orthogonal axes; anything else lands on its own axis.
pub struct TopicEmbedder {
    pub fail: bool,
}

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    fn name(&self) -> &'static str {
        "topic"
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, mentor_embed::ProviderError> {
        if self.fail {
            return Err(mentor_embed::ProviderError::Api {
                status: 500,
                body: "embedding backend down".to_string(),
            });
        }
        let vectors = request
            .inputs
            .iter()
            .map(|text| {
                let t = text.to_lowercase();
                if t.contains("mitosis") {
                    vec![1.0, 0.0, 0.0]
                } else if t.contains("photosynthesis") {
                    vec![0.0, 1.0, 0.0]
                } else {
                    vec![0.0, 0.0, 1.0]
                }
            })
            .collect();
        Ok(EmbeddingResponse {
            provider: "topic".to_string(),
            model: "axes".to_string(),
            vectors,
        })
    }
}

/// Returns a fixed reply (or error) and remembers every request.
pub struct ScriptedChat {
    reply: Result<String, u16>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Vec<ChatMessage> {
        self.requests
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.messages);
        match &self.reply {
            Ok(text) => Ok(ChatResponse {
                provider: "scripted".to_string(),
                model: "stub".to_string(),
                content: text.clone(),
            }),
            Err(status) => Err(ProviderError::Api {
                status: *status,
                body: "stub failure".to_string(),
            }),
        }
    }
}

pub fn corpus() -> Vec<CurriculumChunk> {
    vec![
        CurriculumChunk {
            text: "Mitosis splits one cell into two identical daughter cells.".to_string(),
            lesson: Some("Cell Division".to_string()),
            chapter: Some("Biology".to_string()),
        },
        CurriculumChunk {
            text: "Photosynthesis converts light energy into chemical energy.".to_string(),
            lesson: Some("Plants".to_string()),
            chapter: None,
        },
    ]
}

pub async fn retrieval(fail: bool) -> RetrievalEngine {
    let builder = TopicEmbedder { fail: false };
    let chunks = corpus();
    let index = VectorIndex::build(&builder, &chunks, 32)
        .await
        .expect("build index");
    RetrievalEngine::new(Arc::new(TopicEmbedder { fail }), index, chunks)
}

pub async fn serve(handler: Arc<dyn ConnectionHandler>) -> (SocketAddr, ShutdownHandle) {
    let listener = Listener::bind("127.0.0.1:0", handler, 8)
        .await
        .expect("bind");
    let addr = listener.bound_addr();
    let shutdown = listener.shutdown_handle();
    tokio::spawn(listener.serve());
    (addr, shutdown)
}
