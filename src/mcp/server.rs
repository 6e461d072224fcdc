//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport. One
//! request is handled at a time; the loop ends when the client closes its
//! end of the stream.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{AdapterError, McpError, Result};
use crate::mcp::handler::ToolHandler;
use crate::mcp::types::*;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP server fronting one adapter
pub struct McpServer {
    /// Name advertised during `initialize`
    server_name: String,

    /// Tool handler
    tool_handler: Arc<dyn ToolHandler>,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(server_name: impl Into<String>, tool_handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            server_name: server_name.into(),
            tool_handler,
        }
    }

    /// Run the server on stdio
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, answering on `writer`,
    /// until end of input
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        tracing::info!(server = %self.server_name, "MCP server ready");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let Some(response) = self.handle_message(&line).await else {
                continue;
            };

            let mut frame = serde_json::to_string(&response)?;
            frame.push('\n');
            if let Err(e) = write_frame(&mut writer, frame.as_bytes()).await {
                tracing::warn!(error = %e, "Client disconnected, dropping response");
                return Ok(());
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one incoming JSON-RPC message. Returns `None` for
    /// notifications.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let raw_id = raw
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    raw_id,
                    JsonRpcError::invalid_request(e.to_string()),
                ));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            ));
        }

        if request.is_notification() {
            if request.method == methods::INITIALIZED {
                tracing::info!("Client initialized");
            } else {
                tracing::debug!(method = %request.method, "Ignoring notification");
            }
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            methods::INITIALIZE => JsonRpcResponse::success(id, self.handle_initialize()),
            methods::PING => JsonRpcResponse::success(id, serde_json::json!({})),
            methods::LIST_TOOLS => JsonRpcResponse::success(id, self.handle_list_tools()),
            methods::CALL_TOOL => match self.handle_call_tool(request.params).await {
                Ok(result) => match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
                },
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::invalid_params(&e)),
            },
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };

        Some(response)
    }

    fn handle_initialize(&self) -> Value {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
        };

        serde_json::to_value(result).unwrap_or_default()
    }

    fn handle_list_tools(&self) -> Value {
        let result = ListToolsResult {
            tools: self.tool_handler.registry().list_tools(),
        };

        serde_json::to_value(result).unwrap_or_default()
    }

    /// Envelope-level failures (malformed call, unknown tool) come back as
    /// `Err` and become JSON-RPC errors; everything after that point is a
    /// tool result.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<CallToolResult> {
        let params = match params {
            Some(Value::Object(map)) if map.get("name").map_or(false, Value::is_string) => {
                Value::Object(map)
            }
            _ => {
                return Err(AdapterError::Mcp(McpError::MalformedRequest {
                    message: "tools/call requires a string `name`".to_string(),
                }));
            }
        };
        let params: CallToolParams = serde_json::from_value(params).map_err(|e| {
            AdapterError::Mcp(McpError::MalformedRequest {
                message: e.to_string(),
            })
        })?;

        let descriptor = self.tool_handler.registry().resolve(&params.name)?;
        let started = Instant::now();

        let outcome = match descriptor.validate(params.arguments) {
            Ok(args) => self.tool_handler.call(descriptor.name, args).await,
            Err(e) => Err(e),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(value) => {
                tracing::info!(tool = descriptor.name, elapsed_ms, "Tool call succeeded");
                Ok(CallToolResult::success(value))
            }
            Err(e) => {
                tracing::warn!(
                    tool = descriptor.name,
                    kind = %e.kind(),
                    elapsed_ms,
                    "Tool call failed: {}",
                    e
                );
                Ok(CallToolResult::error(&e))
            }
        }
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> std::io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}
