use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mentor_core::DEFAULT_THRESHOLD;
use mentor_embed::EmbeddingProviderConfig;
use mentor_index::{DEFAULT_BUILD_BATCH, DEFAULT_QUERY_PREFIX, DEFAULT_TOP_K};
use mentor_llm::ChatProviderConfig;
use mentor_storage::DEFAULT_MAX_HISTORY_TURNS;

use crate::codec::DEFAULT_MAX_FRAME_BYTES;
use crate::error::ServerError;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_HISTORY_PATH: &str = "./conversation_history.json";
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;
pub const DEFAULT_IO_TIMEOUT_SECS: usize = 30;
pub const DEFAULT_CHAT_MODEL: &str = "moonshotai/kimi-k2-instruct";
pub const DEFAULT_QUIZ_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Chat,
    Quiz,
}

impl FromStr for ServiceMode {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "qa" => Ok(Self::Chat),
            "quiz" => Ok(Self::Quiz),
            other => Err(ServerError::Config(format!(
                "MENTOR_MODE must be chat or quiz, got {other:?}"
            ))),
        }
    }
}

impl ServiceMode {
    /// Chat queries carry the retrieval prefix; quiz titles are embedded bare.
    pub const fn default_query_prefix(self) -> &'static str {
        match self {
            Self::Chat => DEFAULT_QUERY_PREFIX,
            Self::Quiz => "",
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chat => "chat",
            Self::Quiz => "quiz",
        })
    }
}

/// Per-connection socket limits shared by both services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub io_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS as u64),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub mode: ServiceMode,
    pub addr: String,
    pub corpus_path: PathBuf,
    pub index_path: Option<PathBuf>,
    pub history_path: PathBuf,
    pub max_history_turns: usize,
    pub threshold: f32,
    pub top_k: usize,
    pub query_prefix: String,
    pub build_batch: usize,
    pub max_connections: usize,
    pub connection: ConnectionOptions,
    pub persona_file: Option<PathBuf>,
    pub chat: ChatProviderConfig,
    pub embedding: EmbeddingProviderConfig,
}

impl ServerConfig {
    /// Reads `MENTOR_*` variables. Numeric values are clamped to sane ranges
    /// and fall back to defaults when unparseable.
    pub fn from_env() -> Result<Self, ServerError> {
        let mode = env_string("MENTOR_MODE")
            .map_or(Ok(ServiceMode::Chat), |m| m.parse())?;

        let corpus_path = env_string("MENTOR_CORPUS")
            .map(PathBuf::from)
            .ok_or_else(|| ServerError::Config("MENTOR_CORPUS is not set".to_string()))?;

        let io_timeout_secs = env_usize("MENTOR_IO_TIMEOUT_SECS", DEFAULT_IO_TIMEOUT_SECS, 1, 3600);
        let connection = ConnectionOptions {
            io_timeout: Duration::from_secs(io_timeout_secs as u64),
            max_frame_bytes: env_usize(
                "MENTOR_MAX_FRAME_BYTES",
                DEFAULT_MAX_FRAME_BYTES,
                1024,
                u32::MAX as usize,
            ),
        };

        Ok(Self {
            mode,
            addr: env_string("MENTOR_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            corpus_path,
            index_path: env_string("MENTOR_INDEX").map(PathBuf::from),
            history_path: env_string("MENTOR_HISTORY_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH), PathBuf::from),
            max_history_turns: env_usize(
                "MENTOR_MAX_HISTORY_TURNS",
                DEFAULT_MAX_HISTORY_TURNS,
                1,
                1000,
            ),
            threshold: env_f64("MENTOR_THRESHOLD", f64::from(DEFAULT_THRESHOLD), -1.0, 1.0) as f32,
            top_k: env_usize("MENTOR_TOP_K", DEFAULT_TOP_K, 1, 50),
            query_prefix: std::env::var("MENTOR_QUERY_PREFIX")
                .unwrap_or_else(|_| mode.default_query_prefix().to_string()),
            build_batch: env_usize("MENTOR_BUILD_BATCH", DEFAULT_BUILD_BATCH, 1, 2048),
            max_connections: env_usize("MENTOR_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS, 1, 10_000),
            connection,
            persona_file: env_string("MENTOR_PERSONA_FILE").map(PathBuf::from),
            chat: chat_config_from_env(mode),
            embedding: embedding_config_from_env()?,
        })
    }
}

fn chat_config_from_env(mode: ServiceMode) -> ChatProviderConfig {
    let api_key = env_string("MENTOR_LLM_API_KEY")
        .or_else(|| env_string("GROQ_API_KEY"))
        .unwrap_or_default();
    let model = env_string("MENTOR_LLM_MODEL").unwrap_or_else(|| {
        match mode {
            ServiceMode::Chat => DEFAULT_CHAT_MODEL,
            ServiceMode::Quiz => DEFAULT_QUIZ_MODEL,
        }
        .to_string()
    });
    let mut cfg = ChatProviderConfig::new(api_key, model);
    if let Some(base_url) = env_string("MENTOR_LLM_BASE_URL") {
        cfg.base_url = base_url;
    }
    cfg
}

fn embedding_config_from_env() -> Result<EmbeddingProviderConfig, ServerError> {
    let provider =
        env_string("MENTOR_EMBED_PROVIDER").unwrap_or_else(|| "openai-compatible".to_string());
    let mut cfg = EmbeddingProviderConfig::named(
        &provider,
        env_string("MENTOR_EMBED_API_KEY").unwrap_or_default(),
        env_string("MENTOR_EMBED_MODEL"),
        env_string("MENTOR_EMBED_BASE_URL"),
    )
    .map_err(|e| ServerError::Config(e.to_string()))?;

    if let EmbeddingProviderConfig::OpenAiCompatible(c) = &mut cfg {
        c.query_task = env_string("MENTOR_EMBED_QUERY_TASK");
        c.passage_task = env_string("MENTOR_EMBED_PASSAGE_TASK");
    }
    Ok(cfg)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_usize(name: &str, default: usize, min: usize, max: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

fn env_f64(name: &str, default: f64, min: f64, max: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}
