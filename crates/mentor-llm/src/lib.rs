//! Chat completion access for the tutor: an OpenAI-compatible provider and
//! an [`InferenceClient`] that always yields text, falling back to a fixed
//! apology when the backend fails.

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod providers;
pub mod traits;
pub mod types;

pub use client::{Completion, FailureReason, InferenceClient, DEFAULT_FALLBACK};
pub use config::{ChatProviderConfig, GROQ_BASE_URL};
pub use error::ProviderError;
pub use factory::build_chat_provider;
pub use providers::OpenAiCompatibleChatProvider;
pub use traits::ChatProvider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, ChatRole, SamplingConfig};
