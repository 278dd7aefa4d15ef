//! CLI error types.

use thiserror::Error;

/// Startup and serving failures. Any of these ends the process.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] bridge::ConfigError),

    /// The backend client could not be built.
    #[error(transparent)]
    Backend(#[from] bridge::Error),

    /// The MCP transport failed.
    #[error(transparent)]
    Mcp(#[from] mcp::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
