//! Argument shapes for the exposed tools.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ToolError;
use crate::backend::Role;

/// Arguments for the `generate` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateArguments {
    /// The prompt to send to the model
    pub prompt: String,
    /// Optional system message override
    #[serde(default)]
    pub system: Option<String>,
}

/// One turn of a conversation.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChatMessage {
    /// The role of the message (system, user, assistant)
    pub role: Role,
    /// The content of the message
    pub content: String,
}

/// Arguments for the `chat` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChatArguments {
    /// The list of messages in the conversation
    pub messages: Vec<ChatMessage>,
}

/// Arguments for the `list_models` tool (none).
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListModelsArguments {}

/// Decoded arguments, one variant per tool kind.
#[derive(Debug, Clone)]
pub enum ToolArguments {
    Generate(GenerateArguments),
    Chat(ChatArguments),
    ListModels(ListModelsArguments),
}

/// Decode raw call arguments into `T`. A missing payload counts as `{}`.
pub(crate) fn decode<T: DeserializeOwned>(tool: &str, raw: Value) -> Result<T, ToolError> {
    let raw = if raw.is_null() {
        Value::Object(Map::new())
    } else {
        raw
    };

    serde_json::from_value(raw).map_err(|e| invalid(tool, e.to_string()))
}

pub(crate) fn invalid(tool: &str, message: impl Into<String>) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: message.into(),
    }
}

impl GenerateArguments {
    pub(crate) fn validate(self, tool: &str) -> Result<Self, ToolError> {
        if self.prompt.is_empty() {
            return Err(invalid(tool, "prompt must not be empty"));
        }
        Ok(self)
    }
}
