use std::sync::Arc;
use std::time::Duration;

use crate::admission::AdmissionController;
use crate::config::Config;
use crate::error::Result;
use crate::ingest::{IngestPattern, RouteRemapper};
use crate::proxy::client_pool::ClientPool;
use crate::proxy::forwarding::{ForwardConfig, UpstreamOrigin};
use crate::telemetry::Metrics;

/// Everything a request needs, shared by all connections
pub struct ProxyContext {
    pub pattern: IngestPattern,
    pub remapper: RouteRemapper,
    pub admission: Arc<AdmissionController>,
    pub origin: UpstreamOrigin,
    pub client_pool: ClientPool,
    pub forwarded_headers: bool,
    pub is_https: bool,
    pub hold_delay: Duration,
    pub upstream_timeout: Duration,
    pub metrics: Option<Arc<Metrics>>,
}

impl ProxyContext {
    pub fn from_config(
        config: &Config,
        admission: Arc<AdmissionController>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        Ok(Self {
            pattern: IngestPattern::new(&config.ingest),
            remapper: RouteRemapper::new(&config.remap),
            admission,
            origin: UpstreamOrigin::parse(&config.backend.origin)?,
            client_pool: ClientPool::new(&config.backend, &config.timeout),
            forwarded_headers: config.backend.forwarded_headers,
            is_https: config.is_https(),
            hold_delay: config.admission.hold_delay(),
            upstream_timeout: config.timeout.upstream(),
            metrics,
        })
    }

    pub fn forward_config(&self) -> ForwardConfig<'_> {
        ForwardConfig {
            origin: &self.origin,
            client_pool: &self.client_pool,
            upstream_timeout: self.upstream_timeout,
            metrics: self.metrics.as_ref(),
        }
    }
}
