//! Tool handlers: build a backend request, run it, shape the reply.

use super::arguments::{ChatArguments, GenerateArguments};
use crate::backend::{Backend, ChatRequest, GenerateRequest, Message};
use crate::{Config, Result, aggregate};

pub(crate) async fn generate<B: Backend>(
    config: &Config,
    backend: &B,
    args: GenerateArguments,
) -> Result<String> {
    let request = GenerateRequest {
        model: config.model.clone(),
        prompt: args.prompt,
        // Empty means "use the model's own system message".
        system: args.system.filter(|s| !s.is_empty()),
        max_tokens: config.max_tokens,
    };

    let fragments = backend.generate(request).await?;
    aggregate(fragments).await
}

pub(crate) async fn chat<B: Backend>(
    config: &Config,
    backend: &B,
    args: ChatArguments,
) -> Result<String> {
    let messages = args
        .messages
        .into_iter()
        .map(|m| Message {
            role: m.role,
            content: m.content,
        })
        .collect();

    let request = ChatRequest {
        model: config.model.clone(),
        messages,
        max_tokens: config.max_tokens,
    };

    let fragments = backend.chat(request).await?;
    aggregate(fragments).await
}

pub(crate) async fn list_models<B: Backend>(backend: &B) -> Result<String> {
    let names = backend.list_models().await?;
    Ok(format!("Available models: {}", names.join(", ")))
}
