//! In-memory backend for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;

use super::{Backend, ChatRequest, FragmentStream, GenerateRequest};
use crate::{Error, Result};

/// What a scripted call answers with.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Stream these fragments, then complete.
    Fragments(Vec<&'static str>),
    /// Stream these fragments, then fail with the message.
    FailAfter(Vec<&'static str>, &'static str),
    /// Stream the prompt (or last message) back one character at a time,
    /// yielding to the scheduler between characters.
    Echo,
    /// Never produce anything and never complete.
    Hang,
    /// Fail before any stream exists.
    Reject(&'static str),
}

pub(crate) struct ScriptedBackend {
    script: Script,
    models: Vec<String>,
    pub generate_requests: Mutex<Vec<GenerateRequest>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub list_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            models: Vec::new(),
            generate_requests: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.generate_requests.lock().unwrap().len()
            + self.chat_requests.lock().unwrap().len()
            + self.list_calls.load(Ordering::SeqCst)
    }

    fn play(&self, echo: &str) -> Result<FragmentStream> {
        match &self.script {
            Script::Fragments(parts) => {
                let items: Vec<Result<String>> = parts.iter().map(|p| Ok(p.to_string())).collect();
                Ok(futures::stream::iter(items).boxed())
            }
            Script::FailAfter(parts, message) => {
                let mut items: Vec<Result<String>> =
                    parts.iter().map(|p| Ok(p.to_string())).collect();
                items.push(Err(Error::Backend(message.to_string())));
                Ok(futures::stream::iter(items).boxed())
            }
            Script::Echo => {
                let chars: Vec<String> = echo.chars().map(String::from).collect();
                Ok(futures::stream::iter(chars)
                    .then(|c| async move {
                        tokio::task::yield_now().await;
                        Ok::<_, Error>(c)
                    })
                    .boxed())
            }
            Script::Hang => Ok(futures::stream::pending().boxed()),
            Script::Reject(message) => Err(Error::Network(message.to_string())),
        }
    }
}

impl Backend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<FragmentStream> {
        let echo = request.prompt.clone();
        self.generate_requests.lock().unwrap().push(request);
        self.play(&echo)
    }

    async fn chat(&self, request: ChatRequest) -> Result<FragmentStream> {
        let echo = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.chat_requests.lock().unwrap().push(request);
        self.play(&echo)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reject(message) => Err(Error::Network(message.to_string())),
            Script::Hang => futures::future::pending().await,
            _ => Ok(self.models.clone()),
        }
    }
}
