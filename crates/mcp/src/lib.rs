//! MCP (Model Context Protocol) server library.
//!
//! This crate speaks line-delimited JSON-RPC 2.0 over stdio and routes
//! `tools/list` and `tools/call` to a [`Handler`].
//!
//! # Example
//!
//! ```no_run
//! use mcp::{CallToolResult, Handler, Server, ServerInfo, Tool};
//! use serde_json::Value;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Hello;
//!
//! impl Handler for Hello {
//!     fn server_info(&self) -> ServerInfo {
//!         ServerInfo { name: "hello".into(), version: "0.1.0".into() }
//!     }
//!
//!     fn tools(&self) -> Vec<Tool> {
//!         vec![Tool {
//!             name: "hello".into(),
//!             description: Some("Say hello".into()),
//!             input_schema: serde_json::json!({"type": "object"}),
//!         }]
//!     }
//!
//!     async fn call_tool(
//!         &self,
//!         _name: &str,
//!         _args: Value,
//!         _cancel: CancellationToken,
//!     ) -> CallToolResult {
//!         CallToolResult::text("hello")
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! Server::new(Hello).serve_stdio().await
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, CancelledParams, ClientInfo, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId,
    SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities, ServerInfo, Tool, ToolContent,
    ToolsCapability,
};
pub use server::{Handler, MAX_MESSAGE_SIZE, Server};
