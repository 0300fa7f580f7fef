mod admission;
mod backend;
mod ingest;
mod loader;
mod remap;
mod root;
mod telemetry;
mod timeout;
mod tls;

pub use admission::AdmissionConfig;
pub use backend::BackendConfig;
pub use ingest::IngestConfig;
pub use loader::{load_from_path, load_from_str, validate_config};
pub use remap::{RemapConfig, RemapRoute};
pub use root::Config;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use timeout::TimeoutConfig;
pub use tls::TlsConfig;
