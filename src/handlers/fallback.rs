//! Handling for requests that match no declared route.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::models::ErrorResponse;
use crate::state::AppState;

/// Router fallback.
///
/// With `use_catchall_route` enabled, `POST` requests under the root path
/// go through the degraded catch-all pipeline. Everything else is a JSON 404.
pub async fn fallback(State(state): State<AppState>, request: Request) -> Response {
    if state.config.use_catchall_route
        && *request.method() == Method::POST
        && under_root(state.config.route_prefix(), request.uri().path())
    {
        return state.pipeline.process_catchall(request).await.into_response();
    }

    debug!(method = %request.method(), path = %request.uri().path(), "No route matched");
    not_found(request.uri().path())
}

/// `path` lies strictly below `prefix` (a root path with its trailing slash
/// removed).
fn under_root(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty())
}

fn not_found(path: &str) -> Response {
    let body = ErrorResponse::new("not_found", format!("No route for {path}"));
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
