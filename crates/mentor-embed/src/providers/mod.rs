//! Wire adapters for embedding backends.

pub mod gemini;
pub mod openai_compatible;

pub use gemini::GeminiEmbeddingProvider;
pub use openai_compatible::OpenAiCompatibleEmbeddingProvider;
