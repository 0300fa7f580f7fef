use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ProxyError, Result};

struct ShutdownInner {
    triggered: AtomicBool,
    drain: CancellationToken,
    force: CancellationToken,
}

/// Shutdown latch shared by the accept loop, every connection and the signal handlers.
///
/// Shutdown runs in two phases: `drain` (stop accepting, let in-flight requests finish) and
/// `force` (close whatever is still open). Only the first `trigger` starts it.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                triggered: AtomicBool::new(false),
                drain: CancellationToken::new(),
                force: CancellationToken::new(),
            }),
        }
    }

    /// Start draining. Returns `false` if shutdown was already under way.
    pub fn trigger(&self, source: &str) -> bool {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            debug!(source, "shutdown already in progress");
            return false;
        }
        info!(source, "shutdown requested");
        self.inner.drain.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once draining has started.
    pub async fn draining(&self) {
        self.inner.drain.cancelled().await
    }

    /// Token cancelled when draining starts, for tasks that stop with the server.
    pub fn drain_token(&self) -> CancellationToken {
        self.inner.drain.clone()
    }

    /// Close all remaining connections now.
    pub fn force_close(&self) {
        self.inner.force.cancel();
    }

    pub async fn forced(&self) {
        self.inner.force.cancelled().await
    }
}

/// Trigger `shutdown` on SIGTERM and SIGINT.
///
/// Every signal goes through the latch, so repeated signals are harmless.
pub fn install_signal_handlers(shutdown: Shutdown) -> Result<JoinHandle<()>> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        ProxyError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        ProxyError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    shutdown.trigger("SIGTERM");
                }
                _ = sigint.recv() => {
                    shutdown.trigger("SIGINT");
                }
            }
        }
    }))
}
