//! Health and version endpoints.
//!
//! Both paths are configurable (`health_path`, `version_path`) and bypass
//! the webhook pipeline entirely.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::models::{HealthResponse, VersionResponse};
use crate::state::AppState;

/// Health check endpoint.
///
/// Always returns 200 OK once the server is accepting connections.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "timestamp": "2025-01-15T10:30:00Z",
///   "version": "0.1.0",
///   "uptime_seconds": 3600
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime().as_secs(),
    })
}

/// Version endpoint.
#[instrument]
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}
