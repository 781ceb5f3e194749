//! HTTP server setup and routing
//!
//! Sets up the Axum HTTP server with routes for set control, status, and
//! the SSE observer stream.

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use repsense_common::events::EventBus;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tracker::TrackerHandle;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub tracker: TrackerHandle,
    pub bus: EventBus,
}

/// Build the application router with all routes attached.
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Set control
        .route("/api/set/start", post(super::handlers::start_set))
        .route("/api/set/end", post(super::handlers::end_set))
        .route("/api/status", get(super::handlers::status))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        // Attach application context
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local display clients
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until `shutdown` resolves.
pub async fn run(
    config: &Config,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {e}")))?;

    Ok(())
}
