//! Tool registry, argument decoding, and handlers.

mod arguments;
pub mod errors;
mod handlers;
mod registry;
mod types;

pub use arguments::{
    ChatArguments, ChatMessage, GenerateArguments, ListModelsArguments, ToolArguments,
};
pub use errors::ToolError;
pub use registry::{DEFAULT_CALL_TIMEOUT, SERVER_NAME, ToolRegistry};
pub use types::{ToolDefinition, ToolKind, ToolResult};
