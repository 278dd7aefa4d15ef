//! MCP serve loop over a line-delimited duplex channel (stdio by default).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, CancelledParams, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, ServerInfo, Tool,
};

/// Maximum accepted size of one inbound frame (4MB).
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Trait for the tool side of an MCP server.
///
/// Implementations answer `tools/list` and `tools/call`. A call never fails
/// at the protocol level: tool errors travel inside the `CallToolResult`.
pub trait Handler: Send + Sync + 'static {
    /// Name and version reported from `initialize`.
    fn server_info(&self) -> ServerInfo;

    /// Tools advertised from `tools/list`.
    fn tools(&self) -> Vec<Tool>;

    /// Run one tool call. `cancel` fires when the host cancels the request
    /// or the session ends.
    fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: CancellationToken,
    ) -> impl Future<Output = CallToolResult> + Send;
}

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// An MCP server bound to a handler.
pub struct Server<H> {
    handler: Arc<H>,
    in_flight: InFlight,
}

impl<H: Handler> Server<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serve on the process's stdin and stdout until stdin closes.
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve frames read from `reader`, writing responses to `writer`.
    ///
    /// Each tool call runs on its own task. Responses go through a single
    /// writer task so frames never interleave. When the reader reaches EOF
    /// or fails, in-flight calls are cancelled and drained before returning.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(writer, rx));
        let mut calls = JoinSet::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        info!("serving MCP on stdio");

        let read_result = loop {
            let frame = match read_frame(&mut reader, &mut buf).await {
                Ok(frame) => frame,
                Err(e) => break Err(Error::from(e)),
            };

            // Reap finished calls so the set doesn't grow with session length.
            while calls.try_join_next().is_some() {}

            match frame {
                Frame::Eof => break Ok(()),
                Frame::TooLarge(size) => {
                    warn!(size, "dropping oversized frame");
                    let _ = tx.send(JsonRpcResponse::error(
                        None,
                        JsonRpcError::invalid_request(format!(
                            "message too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                        )),
                    ));
                }
                Frame::Line => {
                    let line = buf.trim_ascii();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_slice::<JsonRpcRequest>(line) {
                        Ok(request) => self.handle(request, &tx, &mut calls).await,
                        Err(e) => {
                            warn!(error = %e, "unparsable frame");
                            let _ = tx.send(JsonRpcResponse::error(
                                None,
                                JsonRpcError::parse_error(e.to_string()),
                            ));
                        }
                    }
                }
            }
        };

        match &read_result {
            Ok(()) => info!("input closed, shutting down"),
            Err(e) => warn!(error = %e, "input failed, shutting down"),
        }
        for token in self.in_flight.lock().await.values() {
            token.cancel();
        }
        while calls.join_next().await.is_some() {}

        drop(tx);
        let written = writer_task
            .await
            .map_err(|e| Error::Writer(e.to_string()))?;
        read_result.and(written)
    }

    async fn handle(
        &self,
        request: JsonRpcRequest,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
        calls: &mut JoinSet<()>,
    ) {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request).await;
            return;
        };

        if request.jsonrpc != "2.0" {
            let _ = tx.send(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
            return;
        }

        debug!(%id, method = %request.method, "request");

        let response = match request.method.as_str() {
            "initialize" => match request.parse_params::<InitializeParams>() {
                Ok(params) => {
                    if let Some(client) = &params.client_info {
                        info!(client = %client.name, version = ?client.version, "client connected");
                    }
                    let result = InitializeResult::negotiate(
                        &params.protocol_version,
                        self.handler.server_info(),
                    );
                    JsonRpcResponse::success(id, result)
                }
                Err(e) => JsonRpcResponse::error(Some(id), e),
            },
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                ListToolsResult {
                    tools: self.handler.tools(),
                },
            ),
            "tools/call" => match request.parse_params::<CallToolParams>() {
                Ok(params) => {
                    self.spawn_call(id, params, tx.clone(), calls).await;
                    return;
                }
                Err(e) => JsonRpcResponse::error(Some(id), e),
            },
            method => JsonRpcResponse::error(Some(id), JsonRpcError::method_not_found(method)),
        };

        let _ = tx.send(response);
    }

    async fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => debug!("client initialized"),
            "notifications/cancelled" => match request.parse_params::<CancelledParams>() {
                Ok(params) => {
                    let in_flight = self.in_flight.lock().await;
                    if let Some(token) = in_flight.get(&params.request_id) {
                        info!(id = %params.request_id, reason = ?params.reason, "cancelling call");
                        token.cancel();
                    }
                }
                Err(e) => warn!(error = %e, "bad cancellation notice"),
            },
            method => debug!(method, "ignoring notification"),
        }
    }

    async fn spawn_call(
        &self,
        id: RequestId,
        params: CallToolParams,
        tx: mpsc::UnboundedSender<JsonRpcResponse>,
        calls: &mut JoinSet<()>,
    ) {
        let cancel = CancellationToken::new();
        self.in_flight.lock().await.insert(id.clone(), cancel.clone());

        let handler = Arc::clone(&self.handler);
        let in_flight = Arc::clone(&self.in_flight);
        let span = tracing::info_span!("tool.call", tool = %params.name, %id);

        calls.spawn(
            async move {
                let arguments = params.arguments.unwrap_or(Value::Null);
                let result = handler.call_tool(&params.name, arguments, cancel).await;
                in_flight.lock().await.remove(&id);
                if result.is_error {
                    debug!("call finished with error result");
                }
                let _ = tx.send(JsonRpcResponse::success(id, result));
            }
            .instrument(span),
        );
    }
}

/// Result of reading one newline-terminated frame.
enum Frame {
    /// A complete frame is in the buffer.
    Line,
    /// The frame exceeded [`MAX_MESSAGE_SIZE`] and was discarded.
    TooLarge(usize),
    Eof,
}

/// Read one frame into `buf` without buffering more than
/// `MAX_MESSAGE_SIZE + 1` bytes of it.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_MESSAGE_SIZE as u64 + 1;

    buf.clear();
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }
    if buf.len() <= MAX_MESSAGE_SIZE || buf.ends_with(b"\n") {
        return Ok(Frame::Line);
    }

    // Skip the rest of the oversized frame.
    let mut size = buf.len();
    loop {
        buf.clear();
        let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        size += read;
        if read == 0 || buf.ends_with(b"\n") {
            break;
        }
    }
    buf.clear();
    Ok(Frame::TooLarge(size))
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let json = serde_json::to_string(&response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
