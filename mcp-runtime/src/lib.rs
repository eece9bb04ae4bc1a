//! Model Context Protocol server for the Attio CRM.
//!
//! JSON-RPC 2.0 over stdio in front of the tool dispatcher. Messages may be
//! newline-delimited or `Content-Length` framed; each reply uses the framing
//! of the message it answers.

use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::Instrument;
use uuid::Uuid;

pub mod args;
pub mod gateway;
#[cfg(test)]
mod testing;
pub mod tools;
mod util;

pub use gateway::{ApiRequest, Gateway, HttpGateway};
pub use tools::{ToolDefinition, call_tool, dispatch, tool_definitions};
pub use util::{DEFAULT_API_URL, DEFAULT_TIMEOUT, GatewayConfig};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "attio-mcp";
const ERROR_PREFIX: &str = "Error: ";

#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Run the Attio MCP server over stdio
    Serve,
    /// Print every tool with its description
    Tools,
    /// Run a single tool and print its text result
    Call(McpCallArgs),
}

#[derive(Args, Clone, Debug)]
pub struct McpCallArgs {
    /// Tool name (e.g. search_records)
    pub tool: String,
    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

/// Runs one subcommand and returns the process exit code.
pub async fn run(config: GatewayConfig, command: McpCommands) -> i32 {
    match command {
        McpCommands::Tools => {
            for tool in tool_definitions() {
                println!("{}\t{}", tool.name, tool.description);
            }
            0
        }
        McpCommands::Serve => {
            let gateway = match HttpGateway::new(config) {
                Ok(gateway) => gateway,
                Err(err) => return report_startup_failure(&err.to_string()),
            };
            let server = McpServer::new(gateway);
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    tracing::error!(error = %err, "mcp server stopped");
                    1
                }
            }
        }
        McpCommands::Call(args) => {
            let arguments: Value = match serde_json::from_str(&args.args) {
                Ok(value) => value,
                Err(err) => {
                    println!("{ERROR_PREFIX}--args is not valid JSON: {err}");
                    return 1;
                }
            };
            let gateway = match HttpGateway::new(config) {
                Ok(gateway) => gateway,
                Err(err) => return report_startup_failure(&err.to_string()),
            };
            let text = dispatch(&gateway, &args.tool, arguments).await;
            println!("{text}");
            if text.starts_with(ERROR_PREFIX) { 1 } else { 0 }
        }
    }
}

fn report_startup_failure(message: &str) -> i32 {
    tracing::error!(error = message, "failed to build Attio gateway");
    1
}

/// One MCP session bound to a gateway.
pub struct McpServer<G> {
    gateway: G,
    session_id: String,
}

impl<G: Gateway> McpServer<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    pub async fn serve_stdio(&self) -> Result<(), String> {
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Answers messages from `reader` until end of input.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(session_id = %self.session_id, "mcp session started");

        loop {
            let frame = read_frame(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let (framing, response) = match frame {
                None => break,
                Some(Frame::Message(framing, payload)) => {
                    let response = match serde_json::from_slice::<Value>(&payload) {
                        Ok(incoming) => self.handle_incoming_message(incoming).await,
                        Err(err) => Some(error_response(
                            Value::Null,
                            RpcError::parse_error(format!("Invalid JSON payload: {err}")),
                        )),
                    };
                    (framing, response)
                }
                Some(Frame::Rejected(framing, reason)) => {
                    tracing::warn!(session_id = %self.session_id, reason, "frame rejected");
                    let response = error_response(Value::Null, RpcError::parse_error(reason));
                    (framing, Some(response))
                }
            };
            if let Some(response) = response {
                write_frame(&mut writer, framing, &response)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        tracing::info!(session_id = %self.session_id, "mcp session ended");
        Ok(())
    }

    /// Single messages yield at most one response; batches yield an array
    /// of the responses to their requests.
    pub async fn handle_incoming_message(&self, incoming: Value) -> Option<Value> {
        let Some(batch) = incoming.as_array() else {
            return self.handle_single_message(incoming).await;
        };

        if batch.is_empty() {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Batch request must not be empty"),
            ));
        }
        let mut responses = Vec::new();
        for item in batch {
            if let Some(response) = self.handle_single_message(item.clone()).await {
                responses.push(response);
            }
        }
        if responses.is_empty() {
            None
        } else {
            Some(Value::Array(responses))
        }
    }

    /// Requests get a response; notifications and client responses
    /// (no `method`) do not.
    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Value::Object(mut message) = incoming else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };
        let id = message.remove("id");

        if message.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let method = message.get("method").and_then(Value::as_str)?;
        let params = message.get("params").cloned().unwrap_or(Value::Null);
        match id {
            Some(id) => Some(match self.handle_request(method, params).await {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            }),
            None => {
                tracing::debug!(session_id = %self.session_id, method, "notification ignored");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => self.tools_list_payload(),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn tools_list_payload(&self) -> Result<Value, RpcError> {
        let tools = serde_json::to_value(tool_definitions())
            .map_err(|e| RpcError::internal(format!("Failed to serialize tools: {e}")))?;
        Ok(json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let span = tracing::info_span!("tools_call", session_id = %self.session_id, tool = name);
        let text = dispatch(&self.gateway, name, arguments)
            .instrument(span)
            .await;

        Ok(json!({
            "content": [
                {
                    "type": "text",
                    "text": text
                }
            ]
        }))
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Line,
    ContentLength,
}

/// Largest `Content-Length` body the server will buffer.
const MAX_FRAME_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Message(Framing, Vec<u8>),
    /// Headers that cannot be honored; answered with a parse error.
    Rejected(Framing, String),
}

/// Next frame from `reader`; `None` at clean EOF.
async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<Result<u64, String>> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        match content_length.take() {
            None if line.trim().is_empty() => {}
            None => match content_length_header(line) {
                Some(parsed) => content_length = Some(parsed),
                None => return Ok(Some(Frame::Message(Framing::Line, line.as_bytes().to_vec()))),
            },
            Some(parsed) if line.is_empty() => return read_body(reader, parsed).await.map(Some),
            // Other headers (Content-Type) carry nothing we need.
            Some(parsed) => content_length = Some(content_length_header(line).unwrap_or(parsed)),
        }
    }
}

/// Reads the body announced by the headers. Oversized bodies are drained so
/// the next frame starts on a boundary.
async fn read_body<R>(reader: &mut R, length: Result<u64, String>) -> Result<Frame, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let length = match length {
        Ok(length) => length,
        Err(message) => return Ok(Frame::Rejected(Framing::ContentLength, message)),
    };
    if length > MAX_FRAME_BYTES {
        io::copy(&mut (&mut *reader).take(length), &mut io::sink()).await?;
        return Ok(Frame::Rejected(
            Framing::ContentLength,
            format!("Content-Length {length} exceeds limit of {MAX_FRAME_BYTES} bytes"),
        ));
    }
    let mut payload = vec![0_u8; length as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Frame::Message(Framing::ContentLength, payload))
}

/// `Some` when `line` is a `Content-Length` header, holding its value or
/// the reason it is unusable.
fn content_length_header(line: &str) -> Option<Result<u64, String>> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    let value = value.trim();
    Some(
        value
            .parse::<u64>()
            .map_err(|_| format!("Invalid Content-Length header: {value:?}")),
    )
}

async fn write_frame<W>(writer: &mut W, framing: Framing, value: &Value) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
