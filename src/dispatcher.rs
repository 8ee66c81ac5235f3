//! JSON-RPC method routing.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::protocol::{
    Inbound, InitializeResult, JsonRpcResponse, ListToolsResult, Method, RpcMessage,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability,
};
use crate::tools::ToolRegistry;

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Server name.
pub const SERVER_NAME: &str = "hostgate-mcp";

/// Server version.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Routes single JSON-RPC messages to their handlers.
///
/// Holds no per-session state: `initialize` can be repeated at will and
/// always answers the same way. The only side effects are those of the tools
/// it calls.
pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl Dispatcher {
    /// Create a dispatcher over the given registry.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            server_info: ServerInfo {
                name: SERVER_NAME.into(),
                version: SERVER_VERSION.into(),
            },
        }
    }

    /// Dispatch one JSON value.
    ///
    /// Requests always get exactly one response carrying their id.
    /// Notifications never get one, even when the method is unknown.
    pub async fn dispatch(&self, message: &Value) -> Option<JsonRpcResponse> {
        let message = match RpcMessage::parse(message) {
            Inbound::Message(message) => message,
            Inbound::Ignored => return None,
            Inbound::Rejected(rejected) => {
                tracing::debug!("Rejected message: {}", rejected.error);
                return Some(JsonRpcResponse::from_error(rejected.id, &rejected.error));
            }
        };

        tracing::debug!(
            "Dispatching {} (id: {})",
            message.method.as_str(),
            message
                .id
                .as_ref()
                .map_or_else(|| "none".to_string(), ToString::to_string)
        );

        if message.is_notification() {
            self.handle_notification(message).await;
            return None;
        }

        let id = message.id.clone();
        Some(match self.handle_request(message).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::from_error(id, &e),
        })
    }

    async fn handle_request(&self, message: RpcMessage) -> Result<Value> {
        match message.method {
            Method::Initialize => Ok(serde_json::to_value(self.initialize_result())?),
            // Acknowledged for clients that send them with an id.
            Method::Initialized | Method::Cancelled | Method::Ping => Ok(json!({})),
            Method::ToolsList => Ok(serde_json::to_value(ListToolsResult {
                tools: self.tools.list_tools(),
            })?),
            Method::ToolsCall => self.handle_tools_call(message.params).await,
            Method::Unknown(name) => Err(Error::MethodNotFound(name)),
        }
    }

    /// Handle a notification (no response expected).
    async fn handle_notification(&self, message: RpcMessage) {
        match message.method {
            Method::Initialized => {
                tracing::info!("Client initialized");
            }
            Method::Cancelled => {
                // Tool calls run to completion; there is nothing to cancel.
                tracing::debug!("Request cancelled by client");
            }
            Method::Unknown(name) => {
                tracing::debug!("Unknown notification: {}", name);
            }
            method => {
                tracing::debug!("Request method {} sent as notification", method.as_str());
                if let Err(e) = self.handle_request(RpcMessage { method, ..message }).await {
                    tracing::debug!("Discarded notification error: {}", e);
                }
            }
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.server_info.clone(),
        }
    }

    /// Handle tools/call request.
    async fn handle_tools_call(&self, params: Value) -> Result<Value> {
        let params = parse_tool_call(params)?;
        let result = self.tools.invoke(&params.name, params.arguments).await?;
        if result.is_error {
            tracing::debug!("Tool {} reported an error", params.name);
        }
        Ok(serde_json::to_value(result)?)
    }
}

fn parse_tool_call(params: Value) -> Result<ToolCallParams> {
    match params.get("name") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(Error::InvalidParams("tool name must be a string".into())),
        None => return Err(Error::InvalidParams("missing tool name".into())),
    }
    match params.get("arguments") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => return Err(Error::InvalidParams("arguments must be an object".into())),
    }

    let mut params = params;
    if let Some(object) = params.as_object_mut() {
        if object.get("arguments").is_some_and(Value::is_null) {
            object.remove("arguments");
        }
    }
    serde_json::from_value(params)
        .map_err(|e| Error::InvalidParams(format!("invalid tool call params: {e}")))
}
