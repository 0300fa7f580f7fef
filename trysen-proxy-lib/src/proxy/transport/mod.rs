pub mod plain;
pub mod tls;

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::lifecycle::Shutdown;
use crate::proxy::context::ProxyContext;
use crate::proxy::handler::handle_request;

pub use plain::handle_plain_connection;
pub use tls::handle_tls_connection;

/// Per-connection handles, cloned from the server for every accepted stream
pub struct ConnectionConfig {
    pub ctx: Arc<ProxyContext>,
    pub builder: ConnBuilder<TokioExecutor>,
    pub shutdown: Shutdown,
}

/// Serve HTTP/1.1 or HTTP/2 on `io` until the client hangs up or shutdown closes it.
///
/// Draining lets the request in flight finish and then closes the connection; a forced close
/// drops it on the spot.
pub(crate) async fn serve_connection<I>(io: I, peer: SocketAddr, config: ConnectionConfig)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ctx = config.ctx;
    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
        let ctx = ctx.clone();
        async move { Ok::<_, hyper::Error>(handle_request(req, peer, &ctx).await) }
    });

    let conn = config.builder.serve_connection(TokioIo::new(io), svc);
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    warn!(?peer, error = %e, "serve_connection error");
                }
                break;
            }
            _ = config.shutdown.draining(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = config.shutdown.forced() => {
                debug!(?peer, "connection closed by forced shutdown");
                break;
            }
        }
    }
}
