//! Tool definitions and call results.

use schemars::JsonSchema;
use serde_json::Value;

use super::ToolError;
use super::arguments::{
    ChatArguments, GenerateArguments, ListModelsArguments, ToolArguments, decode,
};

/// Outcome of one tool call. Exactly one of content or message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Success { content: String },
    Failure { message: String },
}

impl From<ToolError> for ToolResult {
    fn from(error: ToolError) -> Self {
        Self::Failure {
            message: error.to_string(),
        }
    }
}

impl From<ToolResult> for mcp::CallToolResult {
    fn from(result: ToolResult) -> Self {
        match result {
            ToolResult::Success { content } => mcp::CallToolResult::text(content),
            ToolResult::Failure { message } => mcp::CallToolResult::error(message),
        }
    }
}

/// Which handler a tool routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Generate,
    Chat,
    ListModels,
}

impl ToolKind {
    /// Name used in `"<operation> failed: ..."` messages.
    pub fn operation(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Chat => "chat",
            Self::ListModels => "list_models",
        }
    }

    /// Decode and validate raw arguments for this kind of tool.
    pub fn decode(self, tool: &str, raw: Value) -> Result<ToolArguments, ToolError> {
        match self {
            Self::Generate => decode::<GenerateArguments>(tool, raw)?
                .validate(tool)
                .map(ToolArguments::Generate),
            Self::Chat => decode::<ChatArguments>(tool, raw).map(ToolArguments::Chat),
            Self::ListModels => {
                decode::<ListModelsArguments>(tool, raw).map(ToolArguments::ListModels)
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Self::Generate => schema_of::<GenerateArguments>(),
            Self::Chat => schema_of::<ChatArguments>(),
            Self::ListModels => schema_of::<ListModelsArguments>(),
        }
    }
}

fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// A tool exposed to the host.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub kind: ToolKind,
}

impl ToolDefinition {
    /// Define a tool whose schema is derived from its kind's argument type.
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ToolKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: kind.input_schema(),
            kind,
        }
    }

    pub fn generate() -> Self {
        Self::new(
            "generate",
            "Generate text using the configured Ollama model",
            ToolKind::Generate,
        )
    }

    pub fn chat() -> Self {
        Self::new(
            "chat",
            "Multi-turn conversation with the configured Ollama model",
            ToolKind::Chat,
        )
    }

    pub fn list_models() -> Self {
        Self::new(
            "list_models",
            "List available Ollama models",
            ToolKind::ListModels,
        )
    }

    pub fn to_mcp(&self) -> mcp::Tool {
        mcp::Tool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn failure_maps_to_error_result() {
        let result = ToolResult::from(ToolError::Failed {
            operation: "chat",
            source: Error::Backend("boom".into()),
        });
        assert_eq!(
            result,
            ToolResult::Failure {
                message: "chat failed: backend error: boom".into()
            }
        );

        let call: mcp::CallToolResult = result.into();
        assert!(call.is_error);
        assert_eq!(call.content[0].as_text(), Some("chat failed: backend error: boom"));
    }

    #[test]
    fn success_maps_to_single_text_block() {
        let call: mcp::CallToolResult = ToolResult::Success {
            content: "hi".into(),
        }
        .into();
        assert!(!call.is_error);
        assert_eq!(call.content.len(), 1);
        assert_eq!(call.content[0].as_text(), Some("hi"));
    }

    #[test]
    fn list_models_schema_is_an_object() {
        let tool = ToolDefinition::list_models().to_mcp();
        assert_eq!(tool.input_schema["type"], "object");
    }
}
