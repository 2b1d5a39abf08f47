//! Plugin contracts and the registry that holds loaded plugins.
//!
//! Five capabilities are pluggable:
//!
//! | Capability      | Trait             | Invoked                              |
//! |-----------------|-------------------|--------------------------------------|
//! | Authentication  | [`AuthValidator`] | once per request with `auth` config  |
//! | Handler         | [`Handler`]       | once per accepted request            |
//! | Lifecycle       | [`LifecycleHook`] | around every endpoint request        |
//! | Stats           | [`StatsSink`]     | after every request                  |
//! | Failbot         | [`FailbotSink`]   | on unexpected failures               |
//!
//! Implementations are compiled into the binary and registered by name in a
//! [`PluginCatalog`]. Plugin directories hold descriptor files that select
//! catalog entries; see [`registry`] for the loading rules.

pub mod builtin;
pub mod catalog;
pub mod registry;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

use crate::config::AuthConfig;
use crate::error::RequestError;
use crate::pipeline::{Headers, Payload, RequestContext};

pub use self::catalog::{Capability, PluginCatalog};
pub use self::registry::PluginRegistry;

/// Tags attached to metrics and failbot reports.
pub type Tags = BTreeMap<String, String>;

/// Build a [`Tags`] map from string pairs.
pub fn tags<const N: usize>(pairs: [(&str, &str); N]) -> Tags {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Stateless request authenticator.
///
/// Must not fail: any internal fault is reported as `false`.
pub trait AuthValidator: Send + Sync {
    fn valid(&self, payload: &[u8], headers: &HeaderMap, secret: &str, config: &AuthConfig)
    -> bool;
}

/// Everything a handler sees for one request.
#[derive(Debug, Clone, Copy)]
pub struct HandlerRequest<'a> {
    pub payload: &'a Payload,
    pub headers: &'a Headers,
    pub context: &'a RequestContext,
    /// The endpoint's free-form `opts`, unmodified.
    pub opts: &'a Map<String, Value>,
}

/// An error a handler returns on purpose, sent to the client verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerError {
    pub body: Value,
    pub status: StatusCode,
}

impl HandlerError {
    /// Create a declared error. Out-of-range status codes become 500.
    pub fn new(body: impl Into<Value>, status: u16) -> Self {
        Self {
            body: body.into(),
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Why a handler did not produce a result.
#[derive(Debug)]
pub enum HandlerFailure {
    /// Deliberate client-facing error.
    Declared(HandlerError),
    /// Anything else. Becomes a sanitized 500.
    Unexpected(anyhow::Error),
}

impl From<HandlerError> for HandlerFailure {
    fn from(err: HandlerError) -> Self {
        HandlerFailure::Declared(err)
    }
}

impl From<anyhow::Error> for HandlerFailure {
    fn from(err: anyhow::Error) -> Self {
        HandlerFailure::Unexpected(err)
    }
}

impl From<HandlerFailure> for RequestError {
    fn from(failure: HandlerFailure) -> Self {
        match failure {
            HandlerFailure::Declared(err) => RequestError::Declared(err),
            HandlerFailure::Unexpected(err) => RequestError::Unhandled(err),
        }
    }
}

/// Result type returned by handlers.
pub type HandlerResult = Result<Value, HandlerFailure>;

/// Webhook business logic. The returned value becomes the 200 JSON body.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: HandlerRequest<'_>) -> HandlerResult;
}

/// Observer invoked around each endpoint request.
///
/// All methods default to no-ops. Errors are logged and reported but never
/// change the response.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn on_request(&self, _context: &RequestContext, _headers: &HeaderMap) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_response(&self, _context: &RequestContext, _response: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_error(&self, _context: &RequestContext, _error: &RequestError) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Metrics sink.
pub trait StatsSink: Send + Sync {
    fn record(&self, metric: &str, value: f64, tags: &Tags);
    fn increment(&self, metric: &str, tags: &Tags);
    fn timing(&self, metric: &str, duration: Duration, tags: &Tags);
    fn gauge(&self, metric: &str, value: f64, tags: &Tags);
}

/// Error reporting sink.
pub trait FailbotSink: Send + Sync {
    fn report(&self, error: &(dyn std::error::Error + 'static), context: &Tags);
    fn critical(&self, error: &(dyn std::error::Error + 'static), context: &Tags);
    fn warning(&self, message: &str, context: &Tags);
}
