use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("startup failed: {0}")]
    Startup(String),
}
