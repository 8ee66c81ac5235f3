//! MCP protocol types and message handling.
//!
//! Implements the JSON-RPC 2.0 envelopes and the subset of the Model Context
//! Protocol served over the JSON-response HTTP transport:
//! https://modelcontextprotocol.io/specification/2025-03-26

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::Error;

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version (always "2.0").
    pub jsonrpc: String,
    /// Request ID (matches request, `null` when it could not be read).
    pub id: Option<JsonRpcId>,
    /// Result (success case).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (failure case).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<JsonRpcId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Create an error response from a server error.
    pub fn from_error(id: Option<JsonRpcId>, error: &Error) -> Self {
        Self::error(id, error.code(), error.to_string())
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC request ID, echoed back exactly as received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// String ID.
    String(String),
    /// Numeric ID, including ones outside the `i64` range and fractions.
    Number(Number),
}

impl std::fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonRpcId::String(s) => write!(f, "{s}"),
            JsonRpcId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// The closed set of methods the dispatcher understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `notifications/initialized`
    Initialized,
    /// `notifications/cancelled`
    Cancelled,
    /// `ping`
    Ping,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// Anything else, kept verbatim for the error message.
    Unknown(String),
}

impl Method {
    /// Wire name of the method.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Initialize => "initialize",
            Method::Initialized => "notifications/initialized",
            Method::Cancelled => "notifications/cancelled",
            Method::Ping => "ping",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
            Method::Unknown(name) => name,
        }
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        match name {
            "initialize" => Method::Initialize,
            "notifications/initialized" => Method::Initialized,
            "notifications/cancelled" => Method::Cancelled,
            "ping" => Method::Ping,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            other => Method::Unknown(other.to_string()),
        }
    }
}

/// An inbound JSON-RPC message, either a request or a notification.
///
/// The presence of a non-null `id` is the only thing that separates the two.
#[derive(Debug, Clone)]
pub struct RpcMessage {
    /// Request ID, `None` for notifications.
    pub id: Option<JsonRpcId>,
    /// Method to invoke.
    pub method: Method,
    /// Parameters, an empty object when absent.
    pub params: Value,
}

/// A message that could not be read as JSON-RPC.
#[derive(Debug)]
pub struct Rejected {
    /// The id, when it was readable.
    pub id: Option<JsonRpcId>,
    /// Why the message was rejected.
    pub error: Error,
}

/// Outcome of reading one inbound JSON value.
#[derive(Debug)]
pub enum Inbound {
    /// A well-formed request or notification.
    Message(RpcMessage),
    /// Method-less object without an id. Nothing to answer.
    Ignored,
    /// Malformed message to be answered with an error.
    Rejected(Rejected),
}

impl RpcMessage {
    /// Whether no response is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Read one JSON value as a JSON-RPC message.
    pub fn parse(value: &Value) -> Inbound {
        let Some(object) = value.as_object() else {
            return Inbound::Rejected(Rejected {
                id: None,
                error: Error::InvalidRequest("message must be a JSON object".into()),
            });
        };

        let id = match object.get("id") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<JsonRpcId>(raw.clone()) {
                Ok(id) => Some(id),
                Err(_) => {
                    return Inbound::Rejected(Rejected {
                        id: None,
                        error: Error::InvalidRequest("id must be a string or number".into()),
                    });
                }
            },
        };

        let method = match object.get("method").and_then(Value::as_str) {
            Some(method) => Method::from(method),
            None if id.is_none() => return Inbound::Ignored,
            None => {
                return Inbound::Rejected(Rejected {
                    id,
                    error: Error::InvalidRequest("missing method".into()),
                });
            }
        };

        let params = match object.get("params") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(params) => params.clone(),
        };

        Inbound::Message(RpcMessage { id, method, params })
    }
}

// ============================================================================
// MCP-specific protocol types
// ============================================================================

/// MCP initialization result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Protocol version.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
    /// Server info.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tools capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    /// Whether tool list changed notifications are supported.
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Server information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

/// Tool definition for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Input schema (JSON Schema).
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Tool call result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Result content.
    pub content: Vec<ContentItem>,
    /// Whether the tool encountered an error.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// A tool that ran to completion.
    pub fn success(content: Vec<ContentItem>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// A tool that ran but reported a problem.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(message)],
            is_error: true,
        }
    }
}

/// Content item in tool results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentItem {
    /// Text content.
    #[serde(rename = "text")]
    Text {
        /// Text value.
        text: String,
    },
    /// Image content.
    #[serde(rename = "image")]
    Image {
        /// Base64-encoded image data.
        data: String,
        /// MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ContentItem {
    /// Create a text content item.
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    /// Create an image content item from already encoded data.
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ContentItem::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Create an image content item from raw bytes.
    pub fn image_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::image(
            base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type,
        )
    }
}

/// List tools result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Available tools.
    pub tools: Vec<ToolDefinition>,
}
