//! Inference backend abstraction.
//!
//! The tool handlers talk to the model server only through [`Backend`], so
//! tests can swap in a scripted implementation.

mod ollama;
#[cfg(test)]
pub(crate) mod scripted;

pub use ollama::OllamaClient;

use crate::Result;
use futures::stream::BoxStream;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Ordered, single-pass stream of generated text fragments.
///
/// Ends normally on completion; yields one `Err` and then ends on failure.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a conversation sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Single-prompt completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Replaces the model's default system message when set.
    pub system: Option<String>,
    pub max_tokens: u32,
}

/// Multi-turn chat request. Message order is conversational order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

/// Trait for inference backends.
///
/// Each method issues one logical request. No retries, no caching.
pub trait Backend: Send + Sync {
    /// Start a completion and stream its text.
    fn generate(
        &self,
        request: GenerateRequest,
    ) -> impl Future<Output = Result<FragmentStream>> + Send;

    /// Start a chat turn and stream the assistant's text.
    fn chat(&self, request: ChatRequest) -> impl Future<Output = Result<FragmentStream>> + Send;

    /// Names of locally available models, in backend order.
    fn list_models(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}
