//! Shutdown on SIGTERM and SIGINT.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Fans a shutdown request out to every waiter.
///
/// Triggered by a Unix signal once [`SignalHandler::spawn_listener`] runs,
/// or programmatically.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Starts listening for termination signals. Call once at startup.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
            let _ = shutdown_tx.send(true);
            debug!("signal listener stopped");
        });
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> std::io::Result<()> {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("received Ctrl+C, shutting down"),
                Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
            }
            let _ = shutdown_tx.send(true);
        });
        Ok(())
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    pub fn trigger_shutdown(&self) {
        if self.shutdown_tx.send(true).is_err() {
            warn!("no shutdown waiters left");
        }
    }

    /// A future-producing handle that completes once shutdown is requested.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }
}

pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Completes when shutdown is requested, or when the handler is gone.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_is_observed() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());
        handler.trigger_shutdown();
        assert!(handler.is_shutdown());

        // Waiters created after the trigger complete immediately.
        tokio::time::timeout(Duration::from_millis(100), handler.shutdown().wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waiters_wake_on_trigger() {
        let handler = SignalHandler::new();
        let waiter = tokio::spawn(handler.shutdown().wait());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        handler.trigger_shutdown();

        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
