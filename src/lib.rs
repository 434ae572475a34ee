// ============================================================================
// Confab Server
// Direct and group chat backend: Postgres persistence, membership-checked
// routing and best-effort MQTT fan-out to connected clients.
// ============================================================================

pub mod context;
pub mod db;
pub mod groups;
pub mod messages;
pub mod mqtt;
pub mod routes;
pub mod store;

pub use context::AppContext;

use tracing::info;

/// Resolves when the process receives SIGINT or SIGTERM, used for graceful
/// HTTP shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
