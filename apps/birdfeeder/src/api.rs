//! # API Module
//!
//! Read-only status endpoint for monitoring the feeder.
//!
//! - `GET /health`: liveness and version
//! - `GET /status`: running [`FeederStats`]

use crate::error::AppError;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use birdfeeder_core::FeederStats;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Stats shared between the feeder loop and the API.
pub type SharedStats = Arc<RwLock<FeederStats>>;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the status router.
pub fn router(stats: SharedStats) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(stats)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("ok"),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn status(State(stats): State<SharedStats>) -> Json<FeederStats> {
    Json(stats.read().await.clone())
}

/// Serve the status API until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    stats: SharedStats,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "status endpoint listening");
    axum::serve(listener, router(stats))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
