use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendConfig, TimeoutConfig};

pub type HttpClient = Client<HttpConnector, Incoming>;

/// Shared HTTP/1.1 client for the upstream collector
///
/// Every forwarded request goes through the same pool, so keep-alive connections to the
/// backend are reused across inbound connections.
#[derive(Clone)]
pub struct ClientPool {
    http11: Arc<HttpClient>,
}

impl ClientPool {
    pub fn new(backend: &BackendConfig, timeout: &TimeoutConfig) -> Self {
        Self { http11: Arc::new(Self::create_http11_client(backend, timeout)) }
    }

    fn create_http11_client(backend: &BackendConfig, timeout: &TimeoutConfig) -> HttpClient {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout.connect()));
        connector.set_nodelay(true);

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        builder.pool_idle_timeout(Duration::from_secs(backend.pool_idle_timeout_secs));

        if backend.pool_max_idle > 0 {
            builder.pool_max_idle_per_host(backend.pool_max_idle);
        }

        builder.build(connector)
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.http11
    }
}
