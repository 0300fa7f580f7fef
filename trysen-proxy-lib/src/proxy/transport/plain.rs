use std::net::SocketAddr;

use tokio::net::TcpStream;

use super::{serve_connection, ConnectionConfig};

/// Handle a plain HTTP connection
pub async fn handle_plain_connection(stream: TcpStream, peer: SocketAddr, config: ConnectionConfig) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(?peer, error = %e, "failed to set TCP_NODELAY");
    }
    serve_connection(stream, peer, config).await
}
