use http::StatusCode;
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ingest::{Classification, RemapOutcome};
use crate::proxy::context::ProxyContext;
use crate::proxy::drop_response::{drop_response, DropReason};
use crate::proxy::forwarding::forward;
use crate::proxy::handler::headers::add_forwarded_headers;
use crate::proxy::synthetic_response::{synthetic_response, RespBody};

/// Handle one inbound request: classify, admit, remap, then forward or drop.
///
/// Never fails. Forwarding errors become empty error responses and drops become empty `200`s.
pub async fn handle_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    ctx: &ProxyContext,
) -> Response<RespBody> {
    let start = Instant::now();
    let method = req.method().clone();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| "/".to_owned());

    info!(%method, path = %path_and_query, client = %peer.ip(), "request started");

    let response = dispatch(req, peer, ctx, &path_and_query).await;

    let duration = start.elapsed();
    let status = response.status();
    info!(
        %method,
        path = %path_and_query,
        client = %peer.ip(),
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "request finished"
    );
    if let Some(ref m) = ctx.metrics {
        m.record_request(method.as_str(), status.as_u16(), duration.as_secs_f64());
    }

    response
}

async fn dispatch(
    mut req: Request<Incoming>,
    peer: SocketAddr,
    ctx: &ProxyContext,
    path_and_query: &str,
) -> Response<RespBody> {
    let rewritten = match ctx.pattern.classify(req.method(), path_and_query) {
        Classification::NotApplicable => None,
        Classification::IssueSubmission(submission) => {
            let decision = ctx.admission.check(&peer.ip().to_string());
            if let Some(ref m) = ctx.metrics {
                m.record_decision(decision);
            }
            if let Some(reason) = DropReason::from_decision(decision) {
                return reject(ctx, reason, peer).await;
            }

            match ctx
                .remapper
                .resolve(&ctx.pattern, &submission, path_and_query)
            {
                RemapOutcome::Remapped(pq) => {
                    debug!(
                        project_id = %submission.project_id,
                        from = %path_and_query,
                        to = %pq,
                        "remapped issue submission"
                    );
                    if let Some(ref m) = ctx.metrics {
                        m.record_remap();
                    }
                    Some(pq)
                }
                RemapOutcome::Unchanged => None,
                // Stays counted as accepted for the interval
                RemapOutcome::Rejected => {
                    return reject(ctx, DropReason::UnmappedRoute, peer).await;
                }
            }
        }
    };

    if ctx.forwarded_headers {
        add_forwarded_headers(req.headers_mut(), peer, ctx.is_https);
    }

    match forward(req, rewritten.as_deref(), ctx.forward_config()).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(client = %peer.ip(), backend = %ctx.origin, error = %e, "forwarding failed");
            synthetic_response(StatusCode::from(e))
        }
    }
}

async fn reject(ctx: &ProxyContext, reason: DropReason, peer: SocketAddr) -> Response<RespBody> {
    if let Some(ref m) = ctx.metrics {
        m.record_drop(reason.as_str());
    }
    drop_response(reason, ctx.hold_delay, peer.ip()).await
}
