//! Axum host adapter for the MCP transport.
//!
//! Requests are handled strictly one at a time: tool handlers may touch
//! host state that is not safe to share, so the whole request, batch included,
//! runs inside a single lane.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::transport::TransportHandler;

struct HttpState {
    transport: TransportHandler,
    lane: Mutex<()>,
}

/// Build the router serving `transport` at its endpoint path.
pub fn build_router(transport: TransportHandler, cors: bool) -> Router {
    let path = transport.path().to_string();
    let state = Arc::new(HttpState {
        transport,
        lane: Mutex::new(()),
    });

    let router = Router::new()
        .route(&path, any(handle_mcp))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Any method on the MCP endpoint.
async fn handle_mcp(
    State(state): State<Arc<HttpState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let _lane = state.lane.lock().await;
    let reply = state
        .transport
        .handle(method.as_str(), &uri.to_string(), &body)
        .await;
    ([(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, transport: TransportHandler) -> Result<()> {
    let app = build_router(transport, config.cors);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;

    tracing::info!("MCP server listening on {}", config.endpoint_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("MCP server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
