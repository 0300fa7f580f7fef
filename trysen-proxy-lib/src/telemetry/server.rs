use crate::lifecycle::Shutdown;
use crate::telemetry::{
    handle_metrics, health_check_response, live_check_response, ready_check_response,
};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type RespBody = BoxBody<Bytes, hyper::Error>;

fn plain_response(status: StatusCode, text: &'static str) -> Response<RespBody> {
    let body = Full::new(Bytes::from(text))
        .map_err(|never| match never {})
        .boxed();
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp
}

fn route(path: &str, registry: &Registry, shutdown: &Shutdown) -> Response<RespBody> {
    let result = match path {
        "/health" => health_check_response(),
        "/ready" => ready_check_response(shutdown.is_triggered()),
        "/live" => live_check_response(),
        "/metrics" => handle_metrics(registry),
        _ => return plain_response(StatusCode::NOT_FOUND, "Not Found"),
    };
    result.unwrap_or_else(|e| {
        warn!(path, error = %e, "Observability server: failed to build response");
        plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}

/// Start the observability server that handles metrics and health checks
/// This server runs on a dedicated port and serves:
/// - `/metrics` - Prometheus metrics
/// - `/health` - Health check endpoint
/// - `/ready` - Readiness check endpoint, 503 while draining
/// - `/live` - Liveness check endpoint
///
/// `/ready` turns to 503 once `shutdown` starts draining; the server itself keeps answering
/// until `stop` is cancelled.
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    shutdown: Shutdown,
    stop: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    serve_observability(listener, registry, shutdown, stop).await
}

/// Same as [`start_observability_server`] on an already bound listener.
pub async fn serve_observability(
    listener: TcpListener,
    registry: Registry,
    shutdown: Shutdown,
    stop: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(registry);
    info!(addr = ?listener.local_addr()?, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                info!("Observability server: shutdown requested");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let resp = route(req.uri().path(), &registry, &shutdown);
                        async move { Ok::<_, hyper::Error>(resp) }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}
