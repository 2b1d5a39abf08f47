use std::backtrace::BacktraceStatus;
use std::error::Error as _;

use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use uuid::Uuid;

use super::RequestContext;
use crate::error::RequestError;
use crate::models::ErrorResponse;

/// Header carrying the request id on every pipeline response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const SANITIZED_MESSAGE: &str = "An unexpected error occurred";

/// Outcome of one webhook request.
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: Value,
    pub request_id: Uuid,
}

impl WebhookResponse {
    pub fn ok(body: Value, request_id: Uuid) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            request_id,
        }
    }

    /// Shape a failure into its client-facing response.
    ///
    /// Declared handler errors pass through verbatim. Rejections carry a
    /// fixed message. Unexpected failures are sanitized in production and
    /// carry the handler name and diagnostics otherwise.
    pub fn from_error(error: &RequestError, context: &RequestContext, production: bool) -> Self {
        let status = error.status();

        if let RequestError::Declared(declared) = error {
            return Self {
                status,
                body: declared.body.clone(),
                request_id: context.request_id,
            };
        }

        let mut body = ErrorResponse::new(error.kind(), error.to_string())
            .with_request_id(context.request_id);

        if error.is_unhandled() {
            if production {
                body.message = SANITIZED_MESSAGE.to_string();
            } else {
                body.handler = Some(context.handler.clone());
                body.backtrace = Some(diagnostics(error));
            }
        }

        Self {
            status,
            body: serde_json::to_value(body).unwrap_or(Value::Null),
            request_id: context.request_id,
        }
    }
}

/// Captured backtrace when available, otherwise the error source chain.
fn diagnostics(error: &RequestError) -> Vec<String> {
    if let RequestError::Unhandled(inner) = error {
        let backtrace = inner.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            return backtrace.to_string().lines().map(str::to_string).collect();
        }
        return inner.chain().map(ToString::to_string).collect();
    }

    let mut chain = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.request_id.to_string()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response
    }
}
