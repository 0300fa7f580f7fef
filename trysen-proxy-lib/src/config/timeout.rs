use serde::Deserialize;
use std::time::Duration;

/// Timeout configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimeoutConfig {
    /// Upstream connection timeout in milliseconds
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
    /// Maximum time to wait for the upstream response headers, in seconds
    /// The response body is streamed afterwards without a deadline.
    /// Default: 32
    #[serde(default = "default_upstream_timeout")]
    pub upstream_secs: u64,
    /// Graceful shutdown timeout in seconds
    /// In-flight requests get this long before their connections are closed
    /// Default: 2
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
    /// TLS handshake timeout in seconds
    /// Prevents slow clients from holding connections during handshake
    /// Default: 15 seconds
    #[serde(default = "default_tls_handshake_timeout")]
    pub tls_handshake_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            upstream_secs: default_upstream_timeout(),
            shutdown_secs: default_shutdown_timeout(),
            tls_handshake_secs: default_tls_handshake_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn upstream(&self) -> Duration {
        Duration::from_secs(self.upstream_secs)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_secs(self.shutdown_secs)
    }

    pub fn tls_handshake(&self) -> Duration {
        Duration::from_secs(self.tls_handshake_secs)
    }
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_upstream_timeout() -> u64 {
    32
}

fn default_shutdown_timeout() -> u64 {
    2
}

fn default_tls_handshake_timeout() -> u64 {
    15
}
