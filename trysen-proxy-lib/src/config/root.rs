use serde::Deserialize;
use std::net::SocketAddr;

use super::admission::AdmissionConfig;
use super::backend::BackendConfig;
use super::ingest::IngestConfig;
use super::remap::RemapConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;
use super::tls::TlsConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:443" or "127.0.0.1:9001"
    pub listen: SocketAddr,
    /// Upstream collector every request is forwarded to
    pub backend: BackendConfig,
    /// TLS termination configuration (optional)
    /// If not provided, proxy operates in plain HTTP mode
    /// Default: None
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    /// Admission control (interval ceiling + per-client budget)
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// Shape of the issue submission URL
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Project/key remapping applied to admitted issue submissions
    #[serde(default)]
    pub remap: RemapConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Scheme reported to the backend in `x-forwarded-proto`
    pub fn is_https(&self) -> bool {
        self.tls.is_some()
    }
}
