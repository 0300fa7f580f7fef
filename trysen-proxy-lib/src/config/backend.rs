use serde::Deserialize;

/// Upstream collector configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    /// Origin every request path is resolved against
    /// Only the scheme and authority are used, the request keeps its own path
    /// Example: "http://127.0.0.1:9000"
    pub origin: String,
    /// Add `x-real-ip`, `x-forwarded-for` and `x-forwarded-proto` to forwarded requests
    /// Enable when the proxy replaces the TLS-terminating nginx in front of the collector
    /// Default: true
    #[serde(default = "default_true")]
    pub forwarded_headers: bool,
    /// Idle timeout in seconds for pooled upstream connections
    /// Default: 90 seconds
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
    /// Maximum number of idle upstream connections kept open
    /// 0 = unlimited (hyper default)
    /// Default: 0
    #[serde(default)]
    pub pool_max_idle: usize,
}

fn default_true() -> bool {
    true
}

fn default_pool_idle_timeout() -> u64 {
    90
}
