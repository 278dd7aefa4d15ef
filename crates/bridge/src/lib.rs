//! Tool bridge between MCP hosts and a local Ollama server.
//!
//! The bridge exposes three tools, `generate`, `chat` and `list_models`.
//! Each call is decoded into typed arguments, forwarded to a [`Backend`],
//! and the streamed reply is collapsed into one text result.
//!
//! # Example
//!
//! ```no_run
//! use bridge::{Config, OllamaClient, ToolRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::resolve("config.yaml")?;
//! let client = OllamaClient::new(config.base_url()?)?;
//! let registry = ToolRegistry::with_default_tools(config, client);
//! mcp::Server::new(registry).serve_stdio().await?;
//! # Ok(())
//! # }
//! ```

mod aggregator;
pub mod backend;
pub mod config;
mod error;
pub mod tools;

pub use aggregator::aggregate;
pub use backend::{
    Backend, ChatRequest, FragmentStream, GenerateRequest, Message, OllamaClient, Role,
};
pub use config::{
    Config, ConfigError, DEFAULT_CONFIG_PATH, HOST_VAR, MAX_TOKENS_VAR, MODEL_VAR, PORT_VAR,
};
pub use error::{Error, Result};
pub use tools::{
    DEFAULT_CALL_TIMEOUT, SERVER_NAME, ToolDefinition, ToolError, ToolKind, ToolRegistry,
    ToolResult,
};
