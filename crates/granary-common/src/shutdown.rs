//! Shutdown signal shared by the service binaries
//!
//! Container runtimes deliver SIGTERM; terminals deliver SIGINT. Both
//! services hand this future to axum's graceful shutdown so the listener
//! stops accepting while in-flight requests drain. The processor's active
//! job keeps running up to its own deadline.

/// Resolve when the process is asked to stop (SIGINT or SIGTERM)
pub async fn shutdown_signal() {
    let interrupt = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Received interrupt, shutting down"),
        () = terminate => tracing::info!("Received terminate, shutting down"),
    }
}
