use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use serde_json::Map;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hooks_gateway::config::{ConfigSource, GlobalConfig, LogLevel, resolve_endpoints};
use hooks_gateway::plugins::{PluginCatalog, PluginRegistry};
use hooks_gateway::{AppState, build_router, metrics, utils};

/// Environment variable naming the configuration file when no argument is given.
const CONFIG_PATH_VAR: &str = "HOOKS_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
fn init_tracing(level: LogLevel, production: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if production {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_source() -> ConfigSource {
    env::args()
        .nth(1)
        .or_else(|| env::var(CONFIG_PATH_VAR).ok())
        .map_or(ConfigSource::None, |path| ConfigSource::Path(PathBuf::from(path)))
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = match GlobalConfig::resolve(config_source(), Map::new()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogLevel::Info, false);
            error!("Configuration error: {e}");
            return Err(exitcode::CONFIG);
        }
    };
    init_tracing(config.log_level, config.production);

    info!("Starting Hooks Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.host,
        port = %config.port,
        environment = ?config.environment,
        root = %config.root_path,
        "Configuration loaded"
    );
    if config.use_catchall_route && config.production {
        warn!("Catch-all route is enabled in production");
    }

    // Metrics exporter (optional)
    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    // Load plugins and endpoints
    let registry = PluginRegistry::load_all(&config, &PluginCatalog::default()).map_err(|e| {
        error!("Failed to load plugins: {e}");
        exitcode::CONFIG
    })?;
    let endpoints = resolve_endpoints(&config.endpoints_config_dir).map_err(|e| {
        error!("Failed to load endpoints: {e}");
        exitcode::CONFIG
    })?;
    config.check_endpoint_routes(&endpoints).map_err(|e| {
        error!("Invalid endpoint routes: {e}");
        exitcode::CONFIG
    })?;
    info!(count = endpoints.len(), "Endpoints loaded");

    // Build application state and router
    let config = Arc::new(config);
    let state = AppState::new(Arc::clone(&config), Arc::new(registry), endpoints);
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("  GET  {}", config.health_path);
    info!("  GET  {}", config.version_path);
    info!("  POST {}/...", config.route_prefix());

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("Server shutdown complete");
    Ok(())
}
