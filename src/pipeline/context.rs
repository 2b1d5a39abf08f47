use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::EndpointConfig;

/// Per-request metadata visible to handlers and lifecycle hooks.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Full request path as received.
    pub path: String,
    /// Canonical handler name.
    pub handler: String,
    pub received_at: DateTime<Utc>,
    /// Configuration of the endpoint serving this request.
    pub endpoint: Arc<EndpointConfig>,
    started: Instant,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, endpoint: Arc<EndpointConfig>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            path: path.into(),
            handler: endpoint.handler.clone(),
            received_at: Utc::now(),
            endpoint,
            started: Instant::now(),
        }
    }

    /// Context for a request with no declared endpoint, such as the catch-all
    /// route.
    pub fn for_path(path: &str, handler: &str) -> Self {
        Self::new(path, Arc::new(EndpointConfig::new(path, handler)))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
