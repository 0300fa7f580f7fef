#![forbid(unsafe_code)]

pub mod admission;
pub mod config;
pub mod error;
pub mod ingest;
pub mod lifecycle;
pub mod proxy;
pub mod telemetry;
pub mod tls;

pub use admission::{AdmissionController, Decision};
pub use config::{load_from_path, Config, TlsConfig};
pub use error::{ProxyError, Result};
pub use ingest::{Classification, IngestPattern, RouteRemapper};
pub use lifecycle::Shutdown;
pub use proxy::{forwarding, run, ProxyServer};
pub use tls::build_rustls;
