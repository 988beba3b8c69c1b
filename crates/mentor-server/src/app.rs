use std::fs;
use std::sync::Arc;

use mentor_core::{CurriculumGate, PromptSynthesizer};
use mentor_embed::{build_embedding_provider, EmbeddingProvider};
use mentor_index::{load_corpus, RetrievalEngine, VectorIndex};
use mentor_llm::{build_chat_provider, InferenceClient, SamplingConfig};
use mentor_storage::ConversationStore;
use tracing::{info, warn};

use crate::chat::ChatService;
use crate::config::{ServerConfig, ServiceMode};
use crate::error::ServerError;
use crate::listener::ConnectionHandler;
use crate::quiz::QuizService;

/// Loads corpus and index, wires providers and returns the handler for the
/// configured mode.
pub async fn build_handler(config: &ServerConfig) -> Result<Arc<dyn ConnectionHandler>, ServerError> {
    let embed_key = config.embedding.api_key().to_string();
    let embedder = build_embedding_provider(config.embedding.clone())
        .map_err(|e| ServerError::Config(e.redacted(&[embed_key.as_str()])))?;
    let retrieval = build_retrieval(config, embedder).await?;

    let llm_key = config.chat.api_key.clone();
    let chat_provider = build_chat_provider(config.chat.clone())
        .map_err(|e| ServerError::Config(format!("chat provider: {e}")))?;

    let handler: Arc<dyn ConnectionHandler> = match config.mode {
        ServiceMode::Chat => {
            let inference = InferenceClient::new(chat_provider, SamplingConfig::tutoring())
                .with_secret(llm_key);
            let history = Arc::new(
                ConversationStore::open(&config.history_path, config.max_history_turns)
                    .map_err(|e| ServerError::Startup(format!("conversation history: {e}")))?,
            );
            info!(
                path = %config.history_path.display(),
                entries = history.len(),
                last_turn = history.turn_counter(),
                "conversation history ready"
            );
            Arc::new(
                ChatService::new(retrieval, inference, history)
                    .with_prompts(load_prompts(config)?)
                    .with_top_k(config.top_k)
                    .with_options(config.connection)
                    .with_secret(embed_key),
            )
        }
        ServiceMode::Quiz => {
            let inference =
                InferenceClient::new(chat_provider, SamplingConfig::quiz()).with_secret(llm_key);
            Arc::new(
                QuizService::new(retrieval, inference)
                    .with_options(config.connection)
                    .with_secret(embed_key),
            )
        }
    };
    Ok(handler)
}

async fn build_retrieval(
    config: &ServerConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<RetrievalEngine, ServerError> {
    let chunks = load_corpus(&config.corpus_path).map_err(|e| {
        ServerError::Startup(format!("corpus {}: {e}", config.corpus_path.display()))
    })?;

    let index = match &config.index_path {
        Some(path) if path.exists() => VectorIndex::load(path)
            .map_err(|e| ServerError::Startup(format!("index {}: {e}", path.display())))?,
        maybe_path => {
            info!(rows = chunks.len(), "no prebuilt index, embedding corpus");
            let index = VectorIndex::build(embedder.as_ref(), &chunks, config.build_batch)
                .await
                .map_err(|e| ServerError::Startup(format!("index build: {e}")))?;
            if let Some(path) = maybe_path {
                index
                    .save(path)
                    .map_err(|e| ServerError::Startup(format!("index {}: {e}", path.display())))?;
            }
            index
        }
    };

    if index.len() != chunks.len() {
        warn!(
            index_rows = index.len(),
            corpus_rows = chunks.len(),
            "index and corpus sizes differ, rows without a passage are skipped"
        );
    }
    info!(rows = index.len(), dimension = index.dimension(), "vector index ready");

    Ok(RetrievalEngine::new(embedder, index, chunks)
        .with_gate(CurriculumGate::new(config.threshold))
        .with_query_prefix(config.query_prefix.clone()))
}

fn load_prompts(config: &ServerConfig) -> Result<PromptSynthesizer, ServerError> {
    match &config.persona_file {
        Some(path) => {
            let persona = fs::read_to_string(path)
                .map_err(|e| ServerError::Startup(format!("persona {}: {e}", path.display())))?;
            Ok(PromptSynthesizer::new(persona))
        }
        None => Ok(PromptSynthesizer::default()),
    }
}
