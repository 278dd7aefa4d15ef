//! Tool registry and dispatcher.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mcp::{CallToolResult, ServerInfo, Tool};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::arguments::ToolArguments;
use super::handlers;
use super::{ToolDefinition, ToolError, ToolResult};
use crate::backend::Backend;
use crate::{Config, Error, Result};

/// Name reported to hosts during initialization.
pub const SERVER_NAME: &str = "ollama-mcp";

/// Wall-clock ceiling for one tool call, stream included.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Holds the exposed tools and routes calls to their handlers.
///
/// The configuration and backend are shared read-only by every call; no
/// call-scoped state lives here.
pub struct ToolRegistry<B> {
    config: Arc<Config>,
    backend: Arc<B>,
    tools: Vec<ToolDefinition>,
    call_timeout: Duration,
}

impl<B: Backend> ToolRegistry<B> {
    /// Create a registry with no tools.
    pub fn new(config: Config, backend: B) -> Self {
        Self {
            config: Arc::new(config),
            backend: Arc::new(backend),
            tools: Vec::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Create a registry exposing `generate`, `chat` and `list_models`.
    pub fn with_default_tools(config: Config, backend: B) -> Self {
        let mut registry = Self::new(config, backend);
        registry.register(ToolDefinition::generate());
        registry.register(ToolDefinition::chat());
        registry.register(ToolDefinition::list_models());
        registry
    }

    /// Set the per-call wall-clock ceiling.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Add a tool.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already registered.
    pub fn register(&mut self, definition: ToolDefinition) {
        assert!(
            self.get(&definition.name).is_none(),
            "tool `{}` is already registered",
            definition.name
        );
        self.tools.push(definition);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Run one tool call to completion.
    ///
    /// Never panics or propagates: unknown tools, bad arguments, backend
    /// failures, timeouts and cancellation all come back as `Failure`.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> ToolResult {
        match self.try_dispatch(name, arguments, cancel).await {
            Ok(content) => ToolResult::Success { content },
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                e.into()
            }
        }
    }

    async fn try_dispatch(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, ToolError> {
        let definition = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let kind = definition.kind;
        let arguments = kind.decode(name, arguments)?;

        debug!(tool = name, model = %self.config.model, "dispatching");
        self.bounded(cancel, self.run(arguments))
            .await
            .map_err(|source| ToolError::Failed {
                operation: kind.operation(),
                source,
            })
    }

    async fn run(&self, arguments: ToolArguments) -> Result<String> {
        let backend = self.backend.as_ref();
        match arguments {
            ToolArguments::Generate(args) => handlers::generate(&self.config, backend, args).await,
            ToolArguments::Chat(args) => handlers::chat(&self.config, backend, args).await,
            ToolArguments::ListModels(_) => handlers::list_models(backend).await,
        }
    }

    /// Race `call` against cancellation and the wall-clock ceiling.
    ///
    /// Dropping the losing future drops any in-flight HTTP response, which
    /// closes the backend connection.
    async fn bounded<F>(&self, cancel: &CancellationToken, call: F) -> Result<String>
    where
        F: Future<Output = Result<String>>,
    {
        let timeout = self.call_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(timeout, call) => {
                result.unwrap_or_else(|_| Err(Error::Timeout(timeout)))
            }
        }
    }
}

impl<B: Backend + 'static> mcp::Handler for ToolRegistry<B> {
    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::to_mcp).collect()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: CancellationToken,
    ) -> CallToolResult {
        self.dispatch(name, arguments, &cancel).await.into()
    }
}
