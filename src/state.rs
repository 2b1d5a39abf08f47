//! Shared application state for Axum handlers.
//!
//! Everything here is built once at startup and read-only afterwards. The
//! state is cloned per request, so every field is behind an `Arc`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{EndpointConfig, GlobalConfig};
use crate::pipeline::RequestPipeline;
use crate::plugins::PluginRegistry;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Resolved global configuration
    pub config: Arc<GlobalConfig>,
    /// Request processor shared by every webhook route
    pub pipeline: Arc<RequestPipeline>,
    /// Declared endpoints, in load order
    pub endpoints: Arc<Vec<Arc<EndpointConfig>>>,
    /// Server start time, used for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Build state around a pipeline reading secrets from the environment.
    pub fn new(
        config: Arc<GlobalConfig>,
        registry: Arc<PluginRegistry>,
        endpoints: Vec<EndpointConfig>,
    ) -> Self {
        let pipeline = RequestPipeline::new(Arc::clone(&config), registry);
        Self::with_pipeline(pipeline, endpoints)
    }

    /// Build state around a preconfigured pipeline.
    ///
    /// Tests use this to inject secrets and instrumentation.
    pub fn with_pipeline(pipeline: RequestPipeline, endpoints: Vec<EndpointConfig>) -> Self {
        let config = Arc::new(pipeline.config().clone());
        Self {
            config,
            pipeline: Arc::new(pipeline),
            endpoints: Arc::new(endpoints.into_iter().map(Arc::new).collect()),
            started_at: Instant::now(),
        }
    }

    /// Time since the state was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
