use std::net::SocketAddr;
use std::sync::Arc;

use hyper_util::rt::TokioExecutor;
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::admission::{spawn_interval_ticker, AdmissionController};
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::lifecycle::{install_signal_handlers, Shutdown};
use crate::proxy::connection::ConnectionManager;
use crate::proxy::context::ProxyContext;
use crate::proxy::transport::{handle_plain_connection, handle_tls_connection, ConnectionConfig};
use crate::telemetry::{init_metrics, start_observability_server, Metrics};
use crate::tls::build_rustls;

/// Bound listener plus the state shared by every connection.
///
/// Binding is separate from serving so callers can read the local address and grab the
/// shutdown handle before the accept loop runs.
pub struct ProxyServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: Arc<Config>,
    ctx: Arc<ProxyContext>,
    tls_acceptor: Option<TlsAcceptor>,
    shutdown: Shutdown,
    connections: ConnectionManager,
}

impl ProxyServer {
    pub async fn bind(config: Arc<Config>) -> Result<Self> {
        Self::bind_with_metrics(config, None).await
    }

    pub async fn bind_with_metrics(
        config: Arc<Config>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        let tls_acceptor = config.tls.as_ref().map(build_rustls).transpose()?;
        let admission = Arc::new(AdmissionController::new(&config.admission));
        let ctx = Arc::new(ProxyContext::from_config(&config, admission, metrics.clone())?);

        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(ProxyError::Io)?;
        let local_addr = listener.local_addr().map_err(ProxyError::Io)?;

        let shutdown = Shutdown::new();
        let connections = ConnectionManager::new(shutdown.clone(), metrics);

        Ok(Self { listener, local_addr, config, ctx, tls_acceptor, shutdown, connections })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn admission(&self) -> Arc<AdmissionController> {
        self.ctx.admission.clone()
    }

    /// Accept connections until shutdown is triggered, then drain.
    ///
    /// Open connections get `timeout.shutdown_secs` to finish their requests before they are
    /// closed.
    pub async fn serve(self) -> Result<()> {
        let ProxyServer { listener, local_addr, config, ctx, tls_acceptor, shutdown, connections } =
            self;

        let builder = ConnBuilder::new(TokioExecutor::new());
        let tracker = TaskTracker::new();
        let ticker =
            spawn_interval_ticker(ctx.admission.clone(), shutdown.drain_token(), ctx.metrics.clone());
        let handshake_timeout = config.timeout.tls_handshake();

        info!(
            addr = %local_addr,
            tls = tls_acceptor.is_some(),
            backend = %ctx.origin,
            remap_routes = ctx.remapper.len(),
            "starting admission proxy (h1/h2)"
        );

        loop {
            tokio::select! {
                _ = shutdown.draining() => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                result = listener.accept() => {
                    let (stream, peer) = match result {
                        Ok((stream, peer)) => (stream, peer),
                        Err(e) => {
                            warn!(error = %e, "accept error");
                            continue;
                        }
                    };

                    let guard = match connections.try_accept() {
                        Ok(guard) => guard,
                        Err(e) => {
                            debug!(?peer, error = %e, "rejecting connection");
                            continue;
                        }
                    };

                    let connection_config = ConnectionConfig {
                        ctx: ctx.clone(),
                        builder: builder.clone(),
                        shutdown: shutdown.clone(),
                    };
                    let tls_acceptor = tls_acceptor.clone();

                    tracker.spawn(async move {
                        let _guard = guard;
                        match tls_acceptor {
                            Some(acceptor) => {
                                handle_tls_connection(
                                    stream,
                                    peer,
                                    acceptor,
                                    handshake_timeout,
                                    connection_config,
                                )
                                .await
                            }
                            None => handle_plain_connection(stream, peer, connection_config).await,
                        }
                    });
                }
            }
        }

        drop(listener);
        tracker.close();

        let grace = config.timeout.shutdown();
        info!(
            active_connections = connections.active(),
            timeout_secs = grace.as_secs(),
            "Waiting for active connections to finish"
        );
        if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
            warn!(
                active_connections = connections.active(),
                "Shutdown timeout reached, closing remaining connections"
            );
            shutdown.force_close();
            tracker.wait().await;
        }

        if let Err(e) = ticker.await {
            error!(error = %e, "interval ticker task failed");
        }

        info!("Proxy server stopped");
        Ok(())
    }
}

/// Run the proxy described by `config` until SIGTERM or SIGINT.
///
/// Starts the observability server too when `telemetry.metrics_port` is set.
pub async fn run(config: Arc<Config>) -> Result<()> {
    let telemetry = match config.telemetry.metrics_port {
        Some(port) => {
            let (metrics, registry) = init_metrics()
                .map_err(|e| ProxyError::Config(format!("Failed to initialize metrics: {e}")))?;
            Some((port, metrics, registry))
        }
        None => None,
    };

    let server =
        ProxyServer::bind_with_metrics(config, telemetry.as_ref().map(|(_, m, _)| m.clone()))
            .await?;
    let shutdown = server.shutdown_handle();
    let observability_stop = CancellationToken::new();

    if let Some((port, _, registry)) = telemetry {
        let shutdown = shutdown.clone();
        let stop = observability_stop.clone();
        tokio::spawn(async move {
            if let Err(e) = start_observability_server(port, registry, shutdown, stop).await {
                error!(error = %e, "Observability server failed");
            }
        });
    }

    let signals = install_signal_handlers(shutdown)?;
    let result = server.serve().await;
    // Health endpoints stay reachable until the proxy finished draining
    observability_stop.cancel();
    signals.abort();
    result
}
