//! Graceful Shutdown
//!
//! Waits for Ctrl+C or SIGTERM, then flips the server into draining mode so
//! readiness probes fail while axum finishes in-flight connections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

/// Shutdown state shared with the health handlers
#[derive(Debug)]
pub struct ShutdownState {
    draining: AtomicBool,
    start_time: Instant,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self {
            draining: AtomicBool::new(false),
            start_time: Instant::now(),
        }
    }

    /// Check if we're draining
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Stop reporting ready
    pub fn start_drain(&self) {
        info!("Starting graceful shutdown, marking as draining");
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once a shutdown signal arrives
pub async fn graceful_shutdown(shutdown_state: Arc<ShutdownState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    shutdown_state.start_drain();
}
