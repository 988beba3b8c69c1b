use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use mentor_core::{
    classify_intent, format_passage, join_context, PromptSynthesizer, Role, TurnResponse,
    OUT_OF_CURRICULUM_MESSAGE,
};
use mentor_index::{RetrievalEngine, RetrievalError, RetrievalHit, DEFAULT_TOP_K};
use mentor_llm::{ChatMessage, InferenceClient};
use mentor_storage::ConversationStore;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::codec::{read_json, within, write_json};
use crate::config::ConnectionOptions;
use crate::listener::ConnectionHandler;
use crate::protocol::{
    now_timestamp, text_field, ErrorReply, HISTORY_UNAVAILABLE, NO_QUERY, RETRIEVAL_UNAVAILABLE,
};

/// History entries replayed to the model ahead of the new question.
pub const HISTORY_CONTEXT_ENTRIES: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Turn(TurnResponse),
    Rejected(ErrorReply),
}

impl ChatReply {
    /// Only completed turns are written to the history record.
    pub const fn should_persist(&self) -> bool {
        matches!(self, Self::Turn(_))
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Turn(turn) => serde_json::to_value(turn),
            Self::Rejected(err) => serde_json::to_value(err),
        }
    }
}

/// Tutoring pipeline: retrieve, gate, prompt, complete, record.
pub struct ChatService {
    retrieval: RetrievalEngine,
    inference: InferenceClient,
    history: Arc<ConversationStore>,
    prompts: PromptSynthesizer,
    top_k: usize,
    options: ConnectionOptions,
    secrets: Vec<String>,
}

impl ChatService {
    pub fn new(
        retrieval: RetrievalEngine,
        inference: InferenceClient,
        history: Arc<ConversationStore>,
    ) -> Self {
        Self {
            retrieval,
            inference,
            history,
            prompts: PromptSynthesizer::default(),
            top_k: DEFAULT_TOP_K,
            options: ConnectionOptions::default(),
            secrets: Vec::new(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSynthesizer) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Embedding credentials scrubbed from logged retrieval errors.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    pub async fn answer(&self, query: &str) -> ChatReply {
        let query = query.trim();
        if query.is_empty() {
            return ChatReply::Rejected(ErrorReply::stamped(NO_QUERY));
        }

        let t_request = now_timestamp();
        let retrieval = match self.retrieval.retrieve(query, self.top_k).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %describe_retrieval_error(&err, &self.secrets), "retrieval failed");
                return ChatReply::Rejected(ErrorReply::stamped(RETRIEVAL_UNAVAILABLE));
            }
        };

        let response = if retrieval.in_scope {
            let intent = classify_intent(query);
            debug!(%intent, top_score = retrieval.top_score, "query in curriculum");
            let system = self
                .prompts
                .synthesize(intent, &context_text(&retrieval.hits));

            let mut messages = Vec::with_capacity(HISTORY_CONTEXT_ENTRIES + 2);
            messages.push(ChatMessage::system(system));
            messages.extend(
                self.history
                    .recent(HISTORY_CONTEXT_ENTRIES)
                    .into_iter()
                    .map(|turn| match turn.role {
                        Role::User => ChatMessage::user(turn.content),
                        Role::Assistant => ChatMessage::assistant(turn.content),
                    }),
            );
            messages.push(ChatMessage::user(query));
            self.inference.complete(messages).await.into_text()
        } else {
            info!(top_score = retrieval.top_score, "query outside curriculum");
            OUT_OF_CURRICULUM_MESSAGE.to_string()
        };

        let t_response = now_timestamp();
        match self.history.append(query, response, t_request, t_response) {
            Ok(turn) => ChatReply::Turn(turn),
            Err(err) => {
                warn!(error = %err, "cannot record exchange");
                ChatReply::Rejected(ErrorReply::stamped(HISTORY_UNAVAILABLE))
            }
        }
    }

    /// One request/reply exchange. History is written to disk only after the
    /// reply has been delivered.
    pub async fn serve_stream<S>(&self, mut stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let request: Value = match within(
            self.options.io_timeout,
            read_json(&mut stream, self.options.max_frame_bytes),
        )
        .await
        {
            Ok(value) => value,
            Err(err) => {
                debug!(%peer, error = %err, "dropping connection without a readable request");
                return;
            }
        };
        let Some(fields) = request.as_object() else {
            warn!(%peer, "request is not a JSON object");
            return;
        };

        let query = text_field(fields, "query").unwrap_or_default();
        let reply = self.answer(query).await;
        let body = match reply.to_json() {
            Ok(body) => body,
            Err(err) => {
                warn!(%peer, error = %err, "failed to encode reply");
                return;
            }
        };

        match within(self.options.io_timeout, write_json(&mut stream, &body)).await {
            Ok(()) => {
                if let ChatReply::Turn(turn) = &reply {
                    info!(%peer, turn = turn.turn, "exchange delivered");
                }
                if reply.should_persist() {
                    self.persist_history().await;
                }
            }
            Err(err) => warn!(%peer, error = %err, "failed to deliver reply, history not persisted"),
        }
    }

    async fn persist_history(&self) {
        let history = Arc::clone(&self.history);
        if let Err(err) = tokio::task::spawn_blocking(move || history.persist_best_effort()).await {
            warn!(error = %err, "history persistence task failed");
        }
    }
}

#[async_trait]
impl ConnectionHandler for ChatService {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        self.serve_stream(stream, peer).await;
    }
}

fn context_text(hits: &[RetrievalHit]) -> String {
    join_context(
        hits.iter()
            .map(|hit| format_passage(&hit.metadata.chapter, &hit.metadata.lesson, &hit.text)),
    )
}

pub(crate) fn describe_retrieval_error(err: &RetrievalError, secrets: &[String]) -> String {
    match err {
        RetrievalError::Provider(inner) => {
            let secrets = secrets.iter().map(String::as_str).collect::<Vec<_>>();
            inner.redacted(&secrets)
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use mentor_embed::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
    use mentor_index::{CurriculumChunk, HitMetadata, VectorIndex};
    use mentor_llm::{ChatProvider, ChatRequest, ChatResponse, SamplingConfig};
    use tokio::io::duplex;

    use super::*;
    use crate::codec::write_frame;

    static SEQ: AtomicU64 = AtomicU64::new(0);

    struct UnitEmbedder;

    #[async_trait]
    impl EmbeddingProvider for UnitEmbedder {
        fn name(&self) -> &'static str {
            "unit"
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, mentor_embed::ProviderError> {
            Ok(EmbeddingResponse {
                provider: "unit".to_string(),
                model: "unit".to_string(),
                vectors: request.inputs.iter().map(|_| vec![1.0]).collect(),
            })
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatProvider for EchoChat {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn complete(
            &self,
            _request: ChatRequest,
        ) -> Result<ChatResponse, mentor_llm::ProviderError> {
            Ok(ChatResponse {
                provider: "echo".to_string(),
                model: "echo".to_string(),
                content: "Cells divide.".to_string(),
            })
        }
    }

    fn service(tag: &str) -> (ChatService, Arc<ConversationStore>, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "mentor-chat-{tag}-{}-{}.json",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let history = Arc::new(ConversationStore::open(&path, 5).expect("open history"));
        let engine = RetrievalEngine::new(
            Arc::new(UnitEmbedder),
            VectorIndex::new(1, vec![vec![1.0]]).expect("index"),
            vec![CurriculumChunk {
                text: "Mitosis splits a cell.".to_string(),
                lesson: None,
                chapter: None,
            }],
        );
        let inference = InferenceClient::new(Arc::new(EchoChat), SamplingConfig::tutoring());
        let service = ChatService::new(engine, inference, Arc::clone(&history));
        (service, history, path)
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 9))
    }

    #[test]
    fn only_turns_are_persisted() {
        let turn = TurnResponse {
            turn: 1,
            student: mentor_core::ConversationTurn::new(1, Role::User, "q", "t0"),
            assistant: mentor_core::ConversationTurn::new(1, Role::Assistant, "a", "t1"),
        };
        assert!(ChatReply::Turn(turn).should_persist());
        assert!(!ChatReply::Rejected(ErrorReply::stamped(NO_QUERY)).should_persist());
    }

    #[tokio::test]
    async fn undelivered_reply_is_kept_in_memory_but_not_written() {
        let (service, history, path) = service("undelivered");
        let (mut client, server) = duplex(64 * 1024);
        write_frame(&mut client, br#"{"query":"Explain mitosis"}"#)
            .await
            .expect("write request");
        drop(client);

        service.serve_stream(server, peer()).await;

        assert_eq!(history.len(), 2);
        assert_eq!(history.turn_counter(), 1);
        assert!(!path.exists(), "history record written for an undelivered reply");
    }

    #[tokio::test]
    async fn delivered_reply_is_written() {
        let (service, history, path) = service("delivered");
        let (mut client, server) = duplex(64 * 1024);
        write_frame(&mut client, br#"{"query":"Explain mitosis"}"#)
            .await
            .expect("write request");

        service.serve_stream(server, peer()).await;

        let reply: Value = read_json(&mut client, 64 * 1024).await.expect("reply");
        assert_eq!(reply["assistant"]["content"], "Cells divide.");
        assert_eq!(history.len(), 2);
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn context_uses_chapter_lesson_header() {
        let hits = vec![
            RetrievalHit {
                text: "  Mitosis yields two cells. ".to_string(),
                score: 0.9,
                metadata: HitMetadata {
                    lesson: "Division".to_string(),
                    chapter: "Cells".to_string(),
                },
            },
            RetrievalHit {
                text: "Meiosis yields four.".to_string(),
                score: 0.85,
                metadata: HitMetadata {
                    lesson: "Unknown".to_string(),
                    chapter: "Unknown".to_string(),
                },
            },
        ];
        assert_eq!(
            context_text(&hits),
            "Chapter: Cells | Lesson: Division\nMitosis yields two cells.\n\n\
             Chapter: Unknown | Lesson: Unknown\nMeiosis yields four."
        );
        assert_eq!(context_text(&[]), "No specific context available.");
    }
}
