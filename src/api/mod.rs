//! REST API over one completed estimate.
//!
//! Provides three GET endpoints:
//! - `/summary` - request echo, summary statistics and diagnostics
//! - `/candidates` - the labelled recommendations
//! - `/grid` - every evaluated configuration, optionally filtered by PV range

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::estimate::EstimateOutput;

/// Immutable application state shared across all request handlers.
///
/// Built once after the calculation completes and wrapped in `Arc`.
pub struct AppState {
    pub output: EstimateOutput,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/candidates", get(handlers::get_candidates))
        .route("/grid", get(handlers::get_grid))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind to `addr` or the
/// server stops with an error.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
