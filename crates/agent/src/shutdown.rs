//! Termination signal handling.

use tokio_util::sync::CancellationToken;

/// Wait for a termination signal.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the probe stops
/// cleanly whether run interactively or under a process manager. If a
/// handler cannot be installed, that signal is never observed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

/// Spawn a task that cancels `cancel` on the first termination signal.
pub fn cancel_on_signal(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => cancel.cancel(),
            () = cancel.cancelled() => {}
        }
    })
}

/// Wait for the signal task spawned by [`cancel_on_signal`] to finish.
///
/// Returns `false` and logs the error if the task panicked or was aborted.
pub async fn join_signal_task(handle: tokio::task::JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Signal listener task failed");
            false
        }
    }
}
