//! Embedding providers for curriculum retrieval: one trait, an
//! OpenAI-compatible adapter and a Gemini adapter.

pub mod config;
pub mod error;
pub mod factory;
pub mod providers;
pub mod traits;
pub mod types;

pub use config::{EmbeddingProviderConfig, GeminiConfig, OpenAiCompatibleConfig};
pub use error::ProviderError;
pub use factory::build_embedding_provider;
pub use providers::{GeminiEmbeddingProvider, OpenAiCompatibleEmbeddingProvider};
pub use traits::EmbeddingProvider;
pub use types::{EmbeddingRequest, EmbeddingResponse, EmbeddingTask};
