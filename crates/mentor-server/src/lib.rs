pub mod app;
pub mod chat;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod quiz;

pub use app::build_handler;
pub use chat::{ChatReply, ChatService};
pub use codec::FramingError;
pub use config::{ConnectionOptions, ServerConfig, ServiceMode};
pub use error::ServerError;
pub use listener::{ConnectionHandler, Listener, ShutdownHandle};
pub use quiz::QuizService;
