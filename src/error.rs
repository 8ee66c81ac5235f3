//! Error types for the MCP server.
//!
//! The `Display` text of every protocol-facing variant is the `message` that
//! goes on the wire, and [`Error::code`] gives the matching JSON-RPC code.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// MCP server errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Request body is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Message is not a well-formed JSON-RPC request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operator refused access at the consent prompt.
    #[error("Access denied by user")]
    AccessDenied,

    /// GET on the endpoint asks for the streaming transport.
    #[error("SSE streaming not implemented; use POST")]
    StreamingUnsupported,

    /// HTTP method other than POST, GET or DELETE.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Request path is not the MCP endpoint.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// JSON-RPC method is not implemented.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Tool not found.
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Invalid parameters.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Rejected server configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::Parse(_) => codes::PARSE_ERROR,
            Error::InvalidRequest(_)
            | Error::StreamingUnsupported
            | Error::UnsupportedMethod(_)
            | Error::UnknownEndpoint(_) => codes::INVALID_REQUEST,
            Error::AccessDenied => codes::ACCESS_DENIED,
            Error::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            Error::ToolNotFound(_) => codes::UNKNOWN_TOOL,
            Error::InvalidParams(_) => codes::INVALID_PARAMS,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes.
pub mod codes {
    /// Parse error.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Access denied at the consent gate. Shares the invalid-request code.
    pub const ACCESS_DENIED: i32 = INVALID_REQUEST;
    /// Method not found.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Unknown tool name in `tools/call`.
    pub const UNKNOWN_TOOL: i32 = INVALID_PARAMS;
    /// Internal error.
    pub const INTERNAL_ERROR: i32 = -32603;
}
