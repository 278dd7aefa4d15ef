//! MCP error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("writer task failed: {0}")]
    Writer(String),
}

pub type Result<T> = std::result::Result<T, Error>;
