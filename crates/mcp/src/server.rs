//! MCP server implementation.
//!
//! Wraps a `ToolRegistry` and exposes its tools over the MCP protocol.
//! Requests are handled concurrently: a long `run_shell` keeps running while
//! the server keeps answering `ping`, list edits and further runs.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use fanout_tool_runtime::ToolRegistry;

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// Name reported in `initialize` unless overridden.
pub const DEFAULT_SERVER_NAME: &str = "fanout-mcp";

/// MCP server that bridges a `ToolRegistry` to MCP clients.
pub struct McpServer {
    registry: ToolRegistry,
    server_name: String,
    server_version: String,
}

/// What a single inbound line turned into.
enum Inbound {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Reject(JsonRpcResponse),
    Ignore,
}

impl McpServer {
    /// Create a new MCP server wrapping the given tool registry.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set the server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Run the server loop until the transport closes.
    ///
    /// Requests still in flight at EOF are completed and answered before
    /// returning.
    pub async fn run<T: McpTransport>(&self, transport: &mut T) -> Result<(), McpError> {
        info!(server = %self.server_name, tools = self.registry.len(), "MCP server starting");

        let mut in_flight = FuturesUnordered::new();
        loop {
            tokio::select! {
                line = transport.receive() => {
                    let Some(line) = line? else {
                        info!(pending = in_flight.len(), "Transport closed, shutting down");
                        break;
                    };
                    debug!(message = %line, "Received message");
                    match Self::parse(&line) {
                        Inbound::Request(request) => in_flight.push(self.handle_request(request)),
                        Inbound::Notification(notif) => self.handle_notification(&notif),
                        Inbound::Reject(response) => Self::reply(transport, &response).await?,
                        Inbound::Ignore => {}
                    }
                }
                Some(response) = in_flight.next(), if !in_flight.is_empty() => {
                    Self::reply(transport, &response).await?;
                }
            }
        }

        while let Some(response) = in_flight.next().await {
            Self::reply(transport, &response).await?;
        }
        Ok(())
    }

    /// Distinguish requests (have "id") from notifications (no "id").
    fn parse(line: &str) -> Inbound {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON");
                return Inbound::Reject(JsonRpcResponse::failure(
                    RpcId::Null,
                    McpError::JsonParse(e).to_rpc_error(),
                ));
            }
        };

        if raw.get("id").is_none() {
            return match serde_json::from_value(raw) {
                Ok(notif) => Inbound::Notification(notif),
                Err(e) => {
                    debug!(error = %e, "Malformed notification, ignoring");
                    Inbound::Ignore
                }
            };
        }

        let id = raw
            .get("id")
            .and_then(|id| serde_json::from_value::<RpcId>(id.clone()).ok())
            .unwrap_or(RpcId::Null);
        match serde_json::from_value(raw) {
            Ok(request) => Inbound::Request(request),
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON-RPC request");
                Inbound::Reject(JsonRpcResponse::failure(
                    id,
                    McpError::InvalidRequest(e.to_string()).to_rpc_error(),
                ))
            }
        }
    }

    async fn reply<T: McpTransport>(transport: &mut T, response: &JsonRpcResponse) -> Result<(), McpError> {
        let json = serde_json::to_string(response)?;
        debug!(response = %json, "Sending response");
        transport.send(&json).await
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;
        let outcome = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(Value::Object(Default::default())),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            method => {
                warn!(method = %method, "Unknown method");
                Err(McpError::MethodNotFound(method.to_string()))
            }
        };
        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, e.to_rpc_error()),
        }
    }

    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => info!("Client confirmed initialization"),
            // Runs are bounded by their own deadlines; a cancelled request still finishes.
            "notifications/cancelled" => debug!(params = ?notif.params, "Client cancelled a request"),
            method => debug!(method = %method, "Unknown notification, ignoring"),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        info!(
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            protocol = params.protocol_version.as_deref().unwrap_or("unspecified"),
            "Handling initialize"
        );

        to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        })
    }

    fn handle_list_tools(&self) -> Result<Value, McpError> {
        debug!("Handling tools/list");
        let tools = self.registry.list().into_iter().map(ToolInfo::from).collect();
        to_value(ListToolsResult { tools })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params = params.ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call: CallToolParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| McpError::ToolNotFound(call.name.clone()))?;

        debug!(tool = %call.name, "Handling tools/call");
        let result = match tool.execute(call.arguments).await {
            Ok(result) => CallToolResult::from(result),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                CallToolResult::error(e.to_string())
            }
        };
        to_value(result)
    }
}

fn to_value(value: impl Serialize) -> Result<Value, McpError> {
    Ok(serde_json::to_value(value)?)
}
