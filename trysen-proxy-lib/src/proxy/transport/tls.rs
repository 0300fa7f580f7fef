use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, warn};

use super::{serve_connection, ConnectionConfig};

/// Handle a TLS connection
///
/// The handshake is bounded by `handshake_timeout` and abandoned when shutdown starts.
pub async fn handle_tls_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
    config: ConnectionConfig,
) {
    let metrics = config.ctx.metrics.clone();
    let handshake = tokio::time::timeout(handshake_timeout, acceptor.accept(stream));

    let tls = tokio::select! {
        result = handshake => match result {
            Ok(Ok(tls)) => tls,
            Ok(Err(e)) => {
                debug!(?peer, error = %e, "tls accept error");
                if let Some(ref m) = metrics {
                    m.tls_handshake_errors_total.add(1, &[]);
                }
                return;
            }
            Err(_) => {
                warn!(?peer, timeout_secs = handshake_timeout.as_secs(), "tls handshake timeout");
                if let Some(ref m) = metrics {
                    m.tls_handshake_errors_total.add(1, &[]);
                }
                return;
            }
        },
        _ = config.shutdown.draining() => {
            debug!(?peer, "tls handshake abandoned on shutdown");
            return;
        }
    };

    serve_connection(tls, peer, config).await
}
