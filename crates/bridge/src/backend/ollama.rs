//! Ollama HTTP API backend.

use std::time::Duration;

use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Backend, ChatRequest, FragmentStream, GenerateRequest, Message};
use crate::{Error, Result};

const GENERATE_PATH: &str = "api/generate";
const CHAT_PATH: &str = "api/chat";
const TAGS_PATH: &str = "api/tags";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ApiOptions {
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ApiGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ApiOptions,
}

/// One line of a streamed generate or chat response.
#[derive(Debug, Deserialize)]
struct ApiChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    message: Option<ApiChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChunkMessage {
    #[serde(default)]
    content: String,
}

impl ApiChunk {
    fn into_text(self) -> String {
        self.response
            .or(self.message.map(|m| m.content))
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ApiTags {
    #[serde(default)]
    models: Vec<ApiModel>,
}

#[derive(Debug, Deserialize)]
struct ApiModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

/// Ollama API client.
///
/// Holds one pooled HTTP client; safe to share across concurrent calls.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OllamaClient {
    /// Create a client targeting `base_url`.
    pub fn new(base_url: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        // Endpoints are joined relative to the base, so keep its path a directory.
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Network(format!("bad endpoint {path}: {e}")))
    }

    async fn post_stream(&self, path: &str, body: &impl Serialize) -> Result<FragmentStream> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let response = check_status(response).await?;
        Ok(LineDecoder::new(response).into_stream())
    }
}

impl std::fmt::Display for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ollama({})", self.base_url)
    }
}

impl Backend for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> Result<FragmentStream> {
        let body = ApiGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: true,
            options: ApiOptions {
                num_predict: request.max_tokens,
            },
        };
        self.post_stream(GENERATE_PATH, &body).await
    }

    async fn chat(&self, request: ChatRequest) -> Result<FragmentStream> {
        let body = ApiChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
            options: ApiOptions {
                num_predict: request.max_tokens,
            },
        };
        self.post_stream(CHAT_PATH, &body).await
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.endpoint(TAGS_PATH)?;
        debug!(%url, "GET");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let tags: ApiTags = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Turn a non-2xx response into an API error, preferring the body's `error` field.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

/// Splits a newline-delimited JSON body into text fragments.
struct LineDecoder {
    response: Response,
    buffer: Vec<u8>,
    eof: bool,
    finished: bool,
}

impl LineDecoder {
    fn new(response: Response) -> Self {
        Self {
            response,
            buffer: Vec::new(),
            eof: false,
            finished: false,
        }
    }

    fn into_stream(self) -> FragmentStream {
        Box::pin(futures::stream::unfold(self, |mut decoder| async move {
            decoder.next_fragment().await.map(|item| (item, decoder))
        }))
    }

    async fn next_fragment(&mut self) -> Option<Result<String>> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                match self.decode_line(&line) {
                    Ok(Some(text)) => return Some(Ok(text)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            if self.eof {
                if self.buffer.is_empty() {
                    self.finished = true;
                } else {
                    // Final line without a trailing newline.
                    self.buffer.push(b'\n');
                }
                continue;
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => self.buffer.extend_from_slice(&bytes),
                Ok(None) => self.eof = true,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(Error::Network(e.to_string())));
                }
            }
        }
    }

    /// Decode one line. `Ok(None)` means nothing to emit.
    fn decode_line(&mut self, line: &[u8]) -> Result<Option<String>> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(None);
        }

        let chunk: ApiChunk = serde_json::from_slice(line)
            .map_err(|e| Error::InvalidResponse(format!("bad stream line: {e}")))?;

        if let Some(error) = chunk.error {
            return Err(Error::Backend(error));
        }
        if chunk.done {
            self.finished = true;
        }

        let text = chunk.into_text();
        Ok((!text.is_empty()).then_some(text))
    }
}
