//! # Hooks Gateway
//!
//! A webhook gateway that receives provider callbacks over HTTP, verifies
//! them, and dispatches the payload to a named handler plugin:
//!
//! - **Pluggable**: auth verifiers, handlers, lifecycle hooks and
//!   instruments are resolved by name from a plugin catalog
//! - **Secure**: HMAC and shared-secret verification in constant time,
//!   IP allow/block lists, streamed body size limits
//! - **Observable**: per-request tracing spans, request ids on every
//!   response, optional Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layers (Trace → Timeout → Body Limit)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Routes (health, version, one POST per endpoint, fallback)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RequestPipeline                                            │
//! │  (IP filter → size limit → auth → parse → handler)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PluginRegistry (auth, handlers, lifecycle, instruments)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hooks_gateway::config::{ConfigSource, GlobalConfig, resolve_endpoints};
//! use hooks_gateway::plugins::{PluginCatalog, PluginRegistry};
//! use hooks_gateway::{AppState, build_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GlobalConfig::resolve(ConfigSource::None, Default::default())?;
//!     let registry = PluginRegistry::load_all(&config, &PluginCatalog::default())?;
//!     let endpoints = resolve_endpoints(&config.endpoints_config_dir)?;
//!
//!     let state = AppState::new(Arc::new(config), Arc::new(registry), endpoints);
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod components;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ip_filter;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod plugins;
pub mod retry;
pub mod routes;
pub mod signature;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::GlobalConfig;
pub use error::{ConfigError, PluginLoadError, RequestError};
pub use pipeline::{RequestPipeline, WebhookResponse};
pub use routes::build_router;
pub use state::AppState;
