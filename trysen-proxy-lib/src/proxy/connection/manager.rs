use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::Shutdown;
use crate::telemetry::Metrics;

use super::guards::ConnectionGuard;

/// Errors that can occur when trying to accept a connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Server is shutting down")]
    Shutdown,
}

/// Tracks open connections and refuses new ones once shutdown started
pub struct ConnectionManager {
    active_connections: Arc<AtomicUsize>,
    shutdown: Shutdown,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionManager {
    pub fn new(shutdown: Shutdown, metrics: Option<Arc<Metrics>>) -> Self {
        Self { active_connections: Arc::new(AtomicUsize::new(0)), shutdown, metrics }
    }

    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Register a new connection; the returned guard unregisters it when dropped
    pub fn try_accept(&self) -> Result<ConnectionGuard, ConnectionError> {
        if self.shutdown.is_triggered() {
            return Err(ConnectionError::Shutdown);
        }

        self.active_connections.fetch_add(1, Ordering::Relaxed);

        if let Some(ref m) = self.metrics {
            m.connections_total.add(1, &[]);
            m.connections_active.add(1, &[]);
        }

        Ok(ConnectionGuard::new(
            self.active_connections.clone(),
            self.metrics.as_ref().map(|m| m.connections_active.clone()),
        ))
    }
}
