//! # hostgate-mcp
//!
//! Consent-gated MCP (Model Context Protocol) server that exposes host tools
//! to remote automation clients over HTTP.
//!
//! The server speaks JSON-RPC 2.0 on a single endpoint using the Streamable
//! HTTP transport in JSON-response mode: every `POST` gets one
//! `application/json` reply, batches included, and no server-initiated
//! stream is ever opened.
//!
//! ## Components
//!
//! - [`ToolRegistry`]: ordered tool descriptors and their handlers
//! - [`AccessGate`]: the one-time operator consent decision
//! - [`Dispatcher`]: routes `initialize`, `ping`, `tools/list`, `tools/call`
//!   and the lifecycle notifications
//! - [`TransportHandler`]: turns `(method, uri, body)` into `(content type, body)`
//! - [`http`]: the axum adapter that serves it all (feature `http`)
//!
//! ## Usage with an MCP client
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "host": { "url": "http://localhost:2026/mcp" }
//!   }
//! }
//! ```
//!
//! ## Security Model
//!
//! The first request blocks until the operator answers a consent prompt.
//! The answer holds for the lifetime of the process:
//! - Allowed: every client on the endpoint can call every registered tool
//! - Denied: every request of any kind is answered with an access-denied
//!   error until the server is restarted; there is no per-request override
//! - Every inbound method and tool name is written to the audit log

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtin;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod host;
#[cfg(feature = "http")]
pub mod http;
pub mod protocol;
pub mod tools;
pub mod transport;

pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use gate::{AccessGate, ConsentPrompt, ConsentRequest, ConsentState, TerminalPrompt};
pub use host::{AuditSink, FileAuditLog, HostHooks, StatusSink, TracingStatus};
pub use protocol::{ContentItem, JsonRpcResponse, RpcMessage, ToolDefinition};
pub use tools::{Tool, ToolRegistry};
pub use transport::{HttpReply, TransportHandler};
