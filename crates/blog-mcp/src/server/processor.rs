//! MCP request processing.
//!
//! Turns classified JSON-RPC elements into at most one response each. Method
//! dispatch is a closed set; tools run with the caller's identity passed in
//! explicitly.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::jsonrpc::{Inbound, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RpcError};
use crate::config::protocol::{PROTOCOL_VERSION, SERVER_NAME};
use crate::models::Identity;
use crate::tools::{McpTool, ToolContext};

/// Client info sent with `initialize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters of `initialize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Requests this server understands.
#[derive(Debug, Clone)]
pub enum ClientRequest {
    Initialize(InitializeParams),
    Ping,
    ListTools,
    CallTool(CallToolParams),
}

impl ClientRequest {
    /// Decode a method name and its params.
    pub fn parse(method: &str, params: Option<Value>) -> Result<Self, RpcError> {
        match method {
            "initialize" => Ok(Self::Initialize(decode_or_default(params)?)),
            "ping" => Ok(Self::Ping),
            "tools/list" => Ok(Self::ListTools),
            "tools/call" => {
                let params = params.ok_or_else(|| RpcError::invalid_params("missing params"))?;
                serde_json::from_value(params)
                    .map(Self::CallTool)
                    .map_err(|e| RpcError::invalid_params(e.to_string()))
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }
}

/// Notifications this server recognises. All are informational.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotification {
    Initialized,
    Cancelled { request_id: Option<Value>, reason: Option<String> },
    Other(String),
}

impl ClientNotification {
    #[must_use]
    pub fn parse(method: &str, params: Option<&Value>) -> Self {
        match method {
            "notifications/initialized" => Self::Initialized,
            "notifications/cancelled" => Self::Cancelled {
                request_id: params.and_then(|p| p.get("requestId")).cloned(),
                reason: params
                    .and_then(|p| p.get("reason"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            other => Self::Other(other.to_owned()),
        }
    }
}

/// MCP tool info for `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Result of `tools/call`. Tool failures set `is_error` instead of becoming
/// JSON-RPC errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    #[must_use]
    pub fn text(text: String) -> Self {
        Self { content: vec![ContentBlock::Text { text }], is_error: false }
    }

    #[must_use]
    pub fn error(message: String) -> Self {
        Self { content: vec![ContentBlock::Text { text: message }], is_error: true }
    }
}

/// Dispatches JSON-RPC elements to protocol methods and tools.
pub struct McpProcessor {
    tools: Vec<Box<dyn McpTool>>,
    ctx: ToolContext,
}

impl McpProcessor {
    #[must_use]
    pub fn new(tools: Vec<Box<dyn McpTool>>, ctx: ToolContext) -> Self {
        Self { tools, ctx }
    }

    /// Get tool by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// The tool catalog, in registration order.
    #[must_use]
    pub fn tool_catalog(&self) -> Vec<McpToolInfo> {
        self.tools
            .iter()
            .map(|t| McpToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Process one element. Returns `None` for anything that is not answered.
    pub async fn process(&self, caller: &Identity, message: Inbound) -> Option<JsonRpcResponse> {
        match message {
            Inbound::Request(request) => Some(self.handle_request(caller, request).await),
            Inbound::Notification(notification) => {
                self.handle_notification(caller, &notification);
                None
            }
            Inbound::Response { id } => {
                tracing::debug!(id = %id, "Ignoring client response");
                None
            }
            Inbound::Invalid { id, reason } => {
                tracing::debug!(reason = %reason, "Invalid JSON-RPC element");
                Some(JsonRpcResponse::error(id, RpcError::invalid_request(reason)))
            }
        }
    }

    /// Process elements in order, collecting the responses.
    pub async fn process_all(
        &self,
        caller: &Identity,
        messages: Vec<Inbound>,
    ) -> Vec<JsonRpcResponse> {
        let mut responses = Vec::new();
        for message in messages {
            if let Some(response) = self.process(caller, message).await {
                responses.push(response);
            }
        }
        responses
    }

    async fn handle_request(&self, caller: &Identity, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest { id, method, params } = request;
        tracing::debug!(method = %method, user_id = caller.user_id, "Handling MCP request");

        let outcome = match ClientRequest::parse(&method, params) {
            Ok(parsed) => self.dispatch(caller, parsed).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                tracing::debug!(method = %method, code = error.code, "MCP request failed");
                JsonRpcResponse::error(id, error)
            }
        }
    }

    async fn dispatch(&self, caller: &Identity, request: ClientRequest) -> Result<Value, RpcError> {
        match request {
            ClientRequest::Initialize(params) => Ok(self.initialize(&params)),
            ClientRequest::Ping => Ok(serde_json::json!({})),
            ClientRequest::ListTools => Ok(serde_json::json!({ "tools": self.tool_catalog() })),
            ClientRequest::CallTool(params) => {
                let result = self.call_tool(caller, params).await?;
                serde_json::to_value(result).map_err(|e| RpcError::internal_error(e.to_string()))
            }
        }
    }

    fn initialize(&self, params: &InitializeParams) -> Value {
        tracing::info!(
            requested = params.protocol_version.as_deref().unwrap_or("unspecified"),
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            "MCP initialize"
        );

        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(
        &self,
        caller: &Identity,
        params: CallToolParams,
    ) -> Result<CallToolResult, RpcError> {
        let Some(tool) = self.get_tool(&params.name) else {
            return Err(RpcError::invalid_params(format!("Unknown tool: {}", params.name)));
        };

        let arguments = params.arguments.unwrap_or_else(|| serde_json::json!({}));

        tracing::info!(tool = %params.name, user_id = caller.user_id, "Executing tool");

        Ok(match tool.execute(&self.ctx, caller, arguments).await {
            Ok(text) => CallToolResult::text(text),
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool execution failed");
                CallToolResult::error(e.to_user_message())
            }
        })
    }

    fn handle_notification(&self, caller: &Identity, notification: &JsonRpcNotification) {
        match ClientNotification::parse(&notification.method, notification.params.as_ref()) {
            ClientNotification::Initialized => {
                tracing::debug!(user_id = caller.user_id, "Client initialized");
            }
            ClientNotification::Cancelled { request_id, reason } => {
                tracing::debug!(
                    request_id = ?request_id,
                    reason = reason.as_deref().unwrap_or(""),
                    "Client cancelled request"
                );
            }
            ClientNotification::Other(method) => {
                tracing::debug!(method = %method, "Ignoring unknown notification");
            }
        }
    }
}

impl std::fmt::Debug for McpProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpProcessor").field("tools", &self.tools.len()).finish()
    }
}

fn decode_or_default<T: DeserializeOwned + Default>(params: Option<Value>) -> Result<T, RpcError> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map(Option::unwrap_or_default)
        .map_err(|e| RpcError::invalid_params(e.to_string()))
}
