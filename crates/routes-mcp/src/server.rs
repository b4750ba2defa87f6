//! MCP Server
//!
//! Line-delimited JSON-RPC 2.0 over stdio. Requests are answered in arrival
//! order; tool calls go through the [`ToolHandler`].

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::handler::ToolHandler;
use crate::protocol::{
    to_result, CallToolParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, RpcError, ServerCapabilities, ServerInfo, ToolsCapability, PROTOCOL_VERSION,
};
use crate::runner::{CommandRunner, ShellRunner};
use crate::tools::all_tools;

const SERVER_NAME: &str = "rails-routes";

pub struct McpServer<R = ShellRunner> {
    handler: ToolHandler<R>,
    initialized: bool,
}

impl<R: CommandRunner> McpServer<R> {
    pub fn new(handler: ToolHandler<R>) -> Self {
        Self {
            handler,
            initialized: false,
        }
    }

    /// Whether the client has sent `notifications/initialized`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve stdin/stdout until the client goes away
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Answer one JSON-RPC message per line until `reader` reaches EOF
    pub async fn serve<I, O>(&mut self, reader: I, mut writer: O) -> anyhow::Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let message = line.trim();
            if message.is_empty() {
                continue;
            }
            debug!("Received: {}", message);

            let Some(response) = self.respond(message).await else {
                continue;
            };
            let encoded = serde_json::to_string(&response)?;
            debug!("Sending: {}", encoded);
            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("Client disconnected");
        Ok(())
    }

    /// Reply to one message; notifications get no reply
    async fn respond(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                return Some(JsonRpcResponse::new(None, Err(RpcError::parse(e))));
            }
        };

        let Some(id) = request.id else {
            self.notified(&request.method);
            return None;
        };

        let outcome = match request.method.as_str() {
            "initialize" => initialize(),
            "tools/list" => to_result(ListToolsResult { tools: all_tools() }),
            "tools/call" => self.call_tool(request.params).await,
            "ping" => Ok(json!({})),
            other => {
                warn!("Unknown method: {}", other);
                Err(RpcError::method_not_found(other))
            }
        };
        Some(JsonRpcResponse::new(Some(id), outcome))
    }

    fn notified(&mut self, method: &str) {
        match method {
            "notifications/initialized" => {
                info!("Client initialized");
                self.initialized = true;
            }
            "notifications/cancelled" => debug!("Client cancelled a request"),
            other => debug!("Ignoring notification: {}", other),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::invalid_params("missing"))?;
        let params: CallToolParams =
            serde_json::from_value(params).map_err(RpcError::invalid_params)?;

        info!("Calling tool: {}", params.name);
        to_result(self.handler.handle_tool(&params.name, params.arguments).await)
    }
}

fn initialize() -> Result<Value, RpcError> {
    info!("Initializing MCP server");
    to_result(InitializeResult {
        protocol_version: PROTOCOL_VERSION,
        capabilities: ServerCapabilities {
            tools: ToolsCapability {},
        },
        server_info: ServerInfo {
            name: SERVER_NAME,
            version: env!("CARGO_PKG_VERSION"),
            description: "MCP server for Rails route inspection",
        },
    })
}
