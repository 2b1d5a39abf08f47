use tokio::signal;
use tracing::{error, warn};

/// Resolves when the gateway should stop taking webhook deliveries.
///
/// Passed to `axum::serve(..).with_graceful_shutdown`: once it resolves the
/// listener stops accepting connections, while deliveries already inside the
/// pipeline run to completion (handler, hooks and stats included) before
/// the process exits.
///
/// Ctrl+C and SIGTERM both trigger it. A source whose handler cannot be
/// installed is logged and never fires, leaving the other one active.
pub async fn shutdown_signal() {
    let source = interrupt_or_terminate().await;
    warn!(
        signal = source,
        "Stopping webhook intake, draining in-flight deliveries"
    );
}

async fn interrupt_or_terminate() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C, relying on SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM, relying on Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    }
}
