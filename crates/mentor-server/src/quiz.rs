use std::net::SocketAddr;

use async_trait::async_trait;
use mentor_core::{parse_quiz, quiz_system_prompt, quiz_user_message};
use mentor_index::{truncate_passage, RetrievalEngine, DEFAULT_MAX_PASSAGE_CHARS};
use mentor_llm::{ChatMessage, Completion, InferenceClient};
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::chat::describe_retrieval_error;
use crate::codec::{read_json, within, write_json};
use crate::config::ConnectionOptions;
use crate::listener::ConnectionHandler;
use crate::protocol::{text_field, ErrorReply, MISSING_TITLE, NO_PASSAGES, RETRIEVAL_FAILED};

/// One-shot quiz generation. Keeps no history.
pub struct QuizService {
    retrieval: RetrievalEngine,
    inference: InferenceClient,
    max_passage_chars: usize,
    options: ConnectionOptions,
    secrets: Vec<String>,
}

impl QuizService {
    pub fn new(retrieval: RetrievalEngine, inference: InferenceClient) -> Self {
        Self {
            retrieval,
            inference,
            max_passage_chars: DEFAULT_MAX_PASSAGE_CHARS,
            options: ConnectionOptions::default(),
            secrets: Vec::new(),
        }
    }

    pub fn with_max_passage_chars(mut self, max: usize) -> Self {
        self.max_passage_chars = max.max(1);
        self
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    /// Returns the normalized quiz document or an `{error}` object.
    pub async fn generate(&self, request: &Map<String, Value>) -> Value {
        let Some(title) = text_field(request, "title") else {
            return error_value(ErrorReply::new(MISSING_TITLE));
        };
        let notes = text_field(request, "notes").unwrap_or_default();

        let retrieval = match self.retrieval.retrieve(title, 1).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %describe_retrieval_error(&err, &self.secrets), "quiz retrieval failed");
                return error_value(ErrorReply::new(RETRIEVAL_FAILED));
            }
        };
        let passages = retrieval
            .hits
            .iter()
            .map(|hit| truncate_passage(&hit.text, self.max_passage_chars))
            .collect::<Vec<_>>();
        if passages.is_empty() {
            return error_value(ErrorReply::new(NO_PASSAGES));
        }

        let messages = vec![
            ChatMessage::system(quiz_system_prompt()),
            ChatMessage::user(quiz_user_message(title, notes, &passages)),
        ];
        let raw = match self.inference.complete(messages).await {
            Completion::Generated(text) => text,
            Completion::Fallback { reason, .. } => {
                return error_value(ErrorReply::new(format!("Failed to generate quiz: {reason}")));
            }
        };

        match parse_quiz(&raw) {
            Ok(quiz) => {
                info!(title, questions = quiz.questions.len(), "quiz generated");
                serde_json::to_value(&quiz).unwrap_or_else(|err| {
                    error_value(ErrorReply::new(format!("Failed to encode quiz: {err}")))
                })
            }
            Err(err) => {
                warn!(title, error = %err, "model output is not a quiz document");
                error_value(
                    ErrorReply::new(format!("Failed to parse model output: {err}")).with_raw(raw),
                )
            }
        }
    }
}

#[async_trait]
impl ConnectionHandler for QuizService {
    fn name(&self) -> &'static str {
        "quiz"
    }

    async fn handle(&self, mut stream: TcpStream, peer: SocketAddr) {
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

        let reply = self.generate(fields).await;
        if let Err(err) = within(self.options.io_timeout, write_json(&mut stream, &reply)).await {
            warn!(%peer, error = %err, "failed to deliver quiz reply");
        }
    }
}

fn error_value(reply: ErrorReply) -> Value {
    let mut fields = Map::new();
    fields.insert("error".to_string(), Value::String(reply.error));
    if let Some(raw) = reply.raw {
        fields.insert("raw".to_string(), Value::String(raw));
    }
    Value::Object(fields)
}
