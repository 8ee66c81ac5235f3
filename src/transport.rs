//! Streamable HTTP transport, JSON-response mode.
//!
//! The handler is independent of any HTTP stack: the host hands over the
//! method, URI and body of each request and gets back a content type and a
//! body. Every reply is `application/json`, failures included, because errors
//! travel as JSON-RPC error objects rather than HTTP statuses.
//!
//! See: https://modelcontextprotocol.io/specification/2025-03-26/basic/transports#streamable-http

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::gate::AccessGate;
use crate::host::HostHooks;
use crate::protocol::JsonRpcResponse;

/// Content type of every reply.
pub const CONTENT_TYPE: &str = "application/json";

/// Default endpoint path.
pub const DEFAULT_PATH: &str = "/mcp";

/// Confidence reported for the MCP path. Low enough that a more specific
/// handler on the same port still wins.
pub const MATCH_CONFIDENCE: f32 = 0.5;

const DELETE_ACK: &[u8] = br#"{"ok":true}"#;
const EMPTY_OBJECT: &[u8] = b"{}";

/// Methods too chatty for the status line.
const QUIET_METHODS: [&str; 3] = ["ping", "notifications/initialized", "notifications/cancelled"];

/// A reply ready for the host HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// Always [`CONTENT_TYPE`].
    pub content_type: &'static str,
    /// Serialized JSON.
    pub body: Vec<u8>,
}

impl HttpReply {
    fn raw(body: &[u8]) -> Self {
        Self {
            content_type: CONTENT_TYPE,
            body: body.to_vec(),
        }
    }

    fn json(value: &impl Serialize) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                content_type: CONTENT_TYPE,
                body,
            },
            Err(e) => {
                tracing::error!("Failed to serialize reply: {}", e);
                Self::error(&Error::Internal(e.to_string()))
            }
        }
    }

    fn error(error: &Error) -> Self {
        let response = JsonRpcResponse::from_error(None, error);
        // Error envelopes hold only strings and integers.
        Self {
            content_type: CONTENT_TYPE,
            body: serde_json::to_vec(&response).unwrap_or_else(|_| EMPTY_OBJECT.to_vec()),
        }
    }

    /// Parse the body back into JSON.
    pub fn json_body(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }
}

/// Adapts HTTP requests on the MCP endpoint into dispatcher calls.
pub struct TransportHandler {
    path: String,
    dispatcher: Dispatcher,
    gate: AccessGate,
    hooks: HostHooks,
}

impl TransportHandler {
    /// Serve `dispatcher` at [`DEFAULT_PATH`] behind `gate`.
    pub fn new(dispatcher: Dispatcher, gate: AccessGate, hooks: HostHooks) -> Self {
        Self {
            path: DEFAULT_PATH.into(),
            dispatcher,
            gate,
            hooks,
        }
    }

    /// Serve at a different path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// The endpoint path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// How well this handler matches `uri`: [`MATCH_CONFIDENCE`] for the
    /// endpoint path, zero otherwise.
    pub fn match_confidence(&self, uri: &str) -> f32 {
        match endpoint_path(uri) {
            Some(path) if path == self.path => MATCH_CONFIDENCE,
            _ => 0.0,
        }
    }

    /// Handle one HTTP request.
    pub async fn handle(&self, method: &str, uri: &str, body: &[u8]) -> HttpReply {
        if self.match_confidence(uri) == 0.0 {
            let path = endpoint_path(uri).unwrap_or_else(|| uri.to_string());
            return HttpReply::error(&Error::UnknownEndpoint(path));
        }

        if !self.gate.check().await.is_allowed() {
            tracing::debug!("Rejecting {} {}: access denied", method, uri);
            return HttpReply::error(&Error::AccessDenied);
        }

        match method {
            "POST" => self.handle_post(body).await,
            "GET" => HttpReply::error(&Error::StreamingUnsupported),
            "DELETE" => {
                // Sessions are not tracked, so there is nothing to tear down.
                tracing::debug!("Session termination acknowledged");
                HttpReply::raw(DELETE_ACK)
            }
            other => HttpReply::error(&Error::UnsupportedMethod(other.to_string())),
        }
    }

    async fn handle_post(&self, body: &[u8]) -> HttpReply {
        let message: Value = match serde_json::from_slice(body) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Unparseable request body: {}", e);
                return HttpReply::error(&Error::Parse(e));
            }
        };

        match message {
            Value::Array(batch) => {
                let mut responses = Vec::with_capacity(batch.len());
                for item in &batch {
                    self.announce(item);
                    if let Some(response) = self.dispatcher.dispatch(item).await {
                        responses.push(response);
                    }
                }
                match responses.as_slice() {
                    [] => HttpReply::raw(EMPTY_OBJECT),
                    [single] => HttpReply::json(single),
                    _ => HttpReply::json(&responses),
                }
            }
            single => {
                self.announce(&single);
                match self.dispatcher.dispatch(&single).await {
                    Some(response) => HttpReply::json(&response),
                    None => HttpReply::raw(EMPTY_OBJECT),
                }
            }
        }
    }

    /// Record the inbound method before it is dispatched.
    fn announce(&self, message: &Value) {
        let method = message
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("?");

        if method == "tools/call" {
            let tool = message
                .get("params")
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("?");
            self.hooks.announce(&format!("MCP: {tool}"));
            self.hooks.record(&format!("MCP <- {method} -> {tool}"));
        } else {
            if !QUIET_METHODS.contains(&method) {
                self.hooks.announce(&format!("MCP: {method}"));
            }
            self.hooks.record(&format!("MCP <- {method}"));
        }
    }
}

/// Path component of an origin-form or absolute request target.
fn endpoint_path(uri: &str) -> Option<String> {
    let base = Url::parse("http://localhost/").ok()?;
    let url = base.join(uri).ok()?;
    Some(url.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ConsentPrompt, ConsentRequest};
    use crate::host::AuditSink;
    use crate::protocol::{ContentItem, ToolDefinition};
    use crate::tools::ToolRegistry;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Answer(bool, AtomicUsize);

    #[async_trait::async_trait]
    impl ConsentPrompt for Answer {
        async fn ask(&self, _request: &ConsentRequest) -> bool {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0
        }
    }

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl AuditSink for Lines {
        fn append(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    struct Fixture {
        handler: TransportHandler,
        prompt: Arc<Answer>,
        calls: Arc<AtomicUsize>,
        audit: Arc<Lines>,
    }

    fn fixture(allow: bool) -> Fixture {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ToolRegistry::new();
        registry.register_fn(
            ToolDefinition {
                name: "count".into(),
                description: "Counts calls".into(),
                input_schema: json!({"type": "object"}),
            },
            move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(vec![ContentItem::text(n.to_string())])
            },
        );

        let audit = Arc::new(Lines::default());
        let hooks = HostHooks::new(audit.clone(), Arc::new(crate::host::NullSink));
        let prompt = Arc::new(Answer(allow, AtomicUsize::new(0)));
        let gate = AccessGate::new(prompt.clone(), hooks.clone());
        let dispatcher = Dispatcher::new(Arc::new(registry));

        Fixture {
            handler: TransportHandler::new(dispatcher, gate, hooks),
            prompt,
            calls,
            audit,
        }
    }

    async fn post(handler: &TransportHandler, body: &str) -> Value {
        let reply = handler.handle("POST", "/mcp", body.as_bytes()).await;
        assert_eq!(reply.content_type, "application/json");
        reply.json_body().unwrap()
    }

    #[test]
    fn path_extraction() {
        let path = |uri: &str| endpoint_path(uri).unwrap();
        assert_eq!(path("/mcp"), "/mcp");
        assert_eq!(path("/mcp?session=1"), "/mcp");
        assert_eq!(path("/mcp#frag"), "/mcp");
        assert_eq!(path("http://localhost:2026/mcp?x"), "/mcp");
        assert_eq!(path("http://localhost:2026"), "/");
        assert_eq!(path("/mcp?next=http://example.com/cb"), "/mcp");
        assert_eq!(path("/other?x=http://h/mcp"), "/other");
    }

    #[test]
    fn match_confidence_only_for_endpoint() {
        let f = fixture(true);
        assert_eq!(f.handler.match_confidence("/mcp"), 0.5);
        assert_eq!(f.handler.match_confidence("/mcp?x=1"), 0.5);
        assert_eq!(f.handler.match_confidence("/mcp/extra"), 0.0);
        assert_eq!(f.handler.match_confidence("/"), 0.0);
        assert_eq!(f.handler.match_confidence("/mcp?next=http://example.com/cb"), 0.5);
        assert_eq!(f.handler.match_confidence("/other?x=http://h/mcp"), 0.0);
        assert_eq!(f.handler.match_confidence("/mcp/../other"), 0.0);

        let moved = fixture(true).handler.with_path("/tools");
        assert_eq!(moved.match_confidence("/tools"), 0.5);
        assert_eq!(moved.match_confidence("/mcp"), 0.0);
    }

    #[tokio::test]
    async fn single_request_round_trip() {
        let f = fixture(true);
        let body = post(&f.handler, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
        assert_eq!(body, json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
    }

    #[tokio::test]
    async fn single_notification_yields_empty_object() {
        let f = fixture(true);
        let body = post(&f.handler, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn notification_only_batch_yields_empty_object() {
        let f = fixture(true);
        let body = post(&f.handler, r#"[{"method":"notifications/initialized"}]"#).await;
        assert_eq!(body, json!({}));

        let body = post(&f.handler, "[]").await;
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn batch_with_one_response_is_unwrapped() {
        let f = fixture(true);
        let body = post(
            &f.handler,
            r#"[{"jsonrpc":"2.0","method":"notifications/initialized"},
                {"jsonrpc":"2.0","id":"only","method":"ping"}]"#,
        )
        .await;
        assert_eq!(body, json!({"jsonrpc": "2.0", "id": "only", "result": {}}));
    }

    #[tokio::test]
    async fn batch_preserves_request_order() {
        let f = fixture(true);
        let body = post(
            &f.handler,
            r#"[{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"count"}},
                {"jsonrpc":"2.0","method":"notifications/cancelled"},
                {"jsonrpc":"2.0","id":1,"method":"frobnicate"},
                {"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"count"}}]"#,
        )
        .await;

        let responses = body.as_array().unwrap();
        let ids: Vec<_> = responses.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, [json!(3), json!(1), json!(2)]);
        assert_eq!(responses[0]["result"]["content"][0]["text"], "1");
        assert_eq!(responses[1]["error"]["code"], -32601);
        assert_eq!(responses[2]["result"]["content"][0]["text"], "2");
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let f = fixture(true);
        let body = post(&f.handler, "{not json").await;
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Parse error: "));
    }

    #[tokio::test]
    async fn http_methods() {
        let f = fixture(true);

        let get = f.handler.handle("GET", "/mcp", b"").await.json_body().unwrap();
        assert_eq!(get["error"]["code"], -32600);
        assert_eq!(get["error"]["message"], "SSE streaming not implemented; use POST");

        let delete = f.handler.handle("DELETE", "/mcp", b"").await;
        assert_eq!(delete.body, br#"{"ok":true}"#);
        assert_eq!(delete.content_type, "application/json");

        let put = f.handler.handle("PUT", "/mcp", b"{}").await.json_body().unwrap();
        assert_eq!(put["error"]["code"], -32600);
        assert_eq!(put["error"]["message"], "Unsupported HTTP method: PUT");
    }

    #[tokio::test]
    async fn urls_in_the_query_do_not_move_the_endpoint() {
        let f = fixture(true);
        let reply = f
            .handler
            .handle(
                "POST",
                "/mcp?next=http://example.com/cb",
                br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            )
            .await
            .json_body()
            .unwrap();
        assert_eq!(reply, json!({"jsonrpc": "2.0", "id": 1, "result": {}}));

        let elsewhere = f
            .handler
            .handle("POST", "/other?x=http://h/mcp", b"{}")
            .await
            .json_body()
            .unwrap();
        assert_eq!(elsewhere["error"]["message"], "Unknown endpoint: /other");
    }

    #[tokio::test]
    async fn unclaimed_path_skips_the_gate() {
        let f = fixture(true);
        let reply = f.handler.handle("POST", "/other", b"{}").await.json_body().unwrap();
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["error"]["message"], "Unknown endpoint: /other");
        assert_eq!(f.prompt.1.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denial_short_circuits_everything() {
        let f = fixture(false);
        let expected = json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {"code": -32600, "message": "Access denied by user"}
        });

        let call = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"count"}}"#;
        assert_eq!(post(&f.handler, call).await, expected);
        assert_eq!(post(&f.handler, "{garbage").await, expected);
        for method in ["GET", "DELETE", "PATCH"] {
            let reply = f.handler.handle(method, "/mcp", b"").await;
            assert_eq!(reply.json_body().unwrap(), expected);
        }

        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.prompt.1.load(Ordering::SeqCst), 1);
        let audit = f.audit.0.lock().unwrap();
        assert_eq!(audit.as_slice(), ["MCP access DENIED by user"]);
    }

    #[tokio::test]
    async fn audit_names_methods_and_tools() {
        let f = fixture(true);
        post(
            &f.handler,
            r#"[{"jsonrpc":"2.0","id":1,"method":"initialize"},
                {"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"count"}}]"#,
        )
        .await;

        let audit = f.audit.0.lock().unwrap();
        assert_eq!(
            audit.as_slice(),
            [
                "MCP access ALLOWED by user",
                "MCP <- initialize",
                "MCP <- tools/call -> count"
            ]
        );
    }
}
