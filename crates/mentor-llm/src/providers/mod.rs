//! Wire adapters for chat completion backends.

pub mod openai_compatible;

pub use openai_compatible::OpenAiCompatibleChatProvider;
