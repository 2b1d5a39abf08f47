//! Prometheus exporter setup.
//!
//! The exporter is optional (`metrics_port = 0` disables it). When it is
//! off, the `metrics` facade has no recorder and every call made by the
//! `MetricsStats` instrument is a no-op.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `hooks.request.count` - Requests processed (labels: handler, status)
//!
//! ## Histograms
//! - `hooks.request.duration` - Request duration in seconds (labels: handler, status)
//!
//! The Prometheus exporter rewrites the dots to underscores on export.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

use crate::pipeline::{REQUEST_COUNT_METRIC, REQUEST_DURATION_METRIC};

/// Initialize the Prometheus metrics exporter.
///
/// Starts the HTTP listener on `metrics_addr` and registers descriptions
/// for the gateway's own metrics. Plugins may emit further metrics through
/// the stats instrument without registering them here.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (port in use, or
/// a recorder is already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_metrics();

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

fn describe_metrics() {
    describe_counter!(
        REQUEST_COUNT_METRIC,
        "Total number of webhook requests processed"
    );
    describe_histogram!(
        REQUEST_DURATION_METRIC,
        metrics::Unit::Seconds,
        "Webhook request duration in seconds"
    );
}
