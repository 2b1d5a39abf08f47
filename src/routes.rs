//! Application routing.
//!
//! # Layers (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Timeout      │ ← 408 after `request_timeout` seconds
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │    Body Limit    │ ← `request_limit` bytes for extractors
//! └────────┬─────────┘
//!          │
//!          ▼
//!   Route / Fallback
//! ```
//!
//! # Routes
//!
//! - `GET <health_path>` - Health check
//! - `GET <version_path>` - Build version
//! - `POST <root_path><endpoint.path>` - One route per declared endpoint
//! - anything else - JSON 404, or the catch-all pipeline when enabled
//!
//! The webhook pipeline enforces `request_limit` itself while streaming the
//! body, so oversized deliveries get the gateway's 413 error body.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Build the application router with all routes and layers configured.
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // =========================================================================
    // Service Endpoints
    // =========================================================================
    let mut router = Router::new()
        .route(&config.health_path, get(handlers::health_check))
        .route(&config.version_path, get(handlers::version));

    // =========================================================================
    // Webhook Endpoints
    // =========================================================================
    for endpoint in state.endpoints.iter() {
        let route = config.endpoint_route(&endpoint.path);
        info!(route = %route, handler = %endpoint.handler, "Registering webhook endpoint");

        let endpoint = Arc::clone(endpoint);
        router = router.route(
            &route,
            post(move |State(state): State<AppState>, request: Request| {
                let endpoint = Arc::clone(&endpoint);
                async move { state.pipeline.process(endpoint, request).await }
            }),
        );
    }

    if config.use_catchall_route {
        info!(
            root = %config.root_path,
            "Catch-all route enabled, unmatched POSTs use the default handler"
        );
    }
    router = router.fallback(handlers::fallback);

    // =========================================================================
    // Apply Layers (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    info!(bytes = config.request_limit, "Request body size limit configured");
    let limit = usize::try_from(config.request_limit).unwrap_or(usize::MAX);
    router = router.layer(DefaultBodyLimit::max(limit));

    // 2. Timeout
    info!(secs = config.request_timeout, "Request timeout configured");
    router = router.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        config.request_timeout(),
    ));

    // 3. Tracing
    router = router.layer(TraceLayer::new_for_http());

    router.with_state(state)
}
