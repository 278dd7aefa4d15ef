use thiserror::Error;

use crate::Error;

/// Why a tool call failed. The `Display` text is what the caller sees.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{operation} failed: {source}")]
    Failed {
        operation: &'static str,
        source: Error,
    },
}
