use crate::error::{ProxyError, Result};
use crate::proxy::client_pool::ClientPool;
use crate::proxy::http_result::{HttpError, HttpResult};
use crate::proxy::synthetic_response::RespBody;
use crate::telemetry::Metrics;
use http::uri::{Authority, Scheme};
use http::{header, HeaderValue, Request, Response, Uri, Version};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Scheme and authority of the upstream collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamOrigin {
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamOrigin {
    /// Parse `http://host:port`. Any path on the origin is ignored.
    pub fn parse(origin: &str) -> Result<Self> {
        let uri: Uri = origin.parse()?;
        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| ProxyError::Config(format!("backend origin {origin} has no scheme")))?;
        if scheme != Scheme::HTTP {
            return Err(ProxyError::Config(format!(
                "backend origin {origin} must use http, got {scheme}"
            )));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| ProxyError::Config(format!("backend origin {origin} has no host")))?;
        Ok(Self { scheme, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute upstream URI for `path_and_query`
    pub fn uri_for(&self, path_and_query: &str) -> HttpResult<Uri> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| HttpError::InvalidUri(e.to_string()))
    }
}

impl fmt::Display for UpstreamOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

pub struct ForwardConfig<'a> {
    pub origin: &'a UpstreamOrigin,
    pub client_pool: &'a ClientPool,
    pub upstream_timeout: Duration,
    pub metrics: Option<&'a Arc<Metrics>>,
}

/// Send `req` to the upstream origin and stream the answer back.
///
/// `path_and_query` replaces the request's own path and query when set. Headers are passed
/// through untouched, `Host` included. The timeout only covers waiting for the response head.
pub async fn forward(
    req: Request<Incoming>,
    path_and_query: Option<&str>,
    config: ForwardConfig<'_>,
) -> HttpResult<Response<RespBody>> {
    let start = Instant::now();
    let (mut parts, body) = req.into_parts();

    let uri = match path_and_query {
        Some(pq) => config.origin.uri_for(pq)?,
        None => config
            .origin
            .uri_for(parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"))?,
    };

    // HTTP/2 clients send the host as :authority
    if !parts.headers.contains_key(header::HOST) {
        if let Some(authority) = parts.uri.authority() {
            if let Ok(hv) = HeaderValue::from_str(authority.as_str()) {
                parts.headers.insert(header::HOST, hv);
            }
        }
    }
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    let out_req = Request::from_parts(parts, body);
    let result =
        tokio::time::timeout(config.upstream_timeout, config.client_pool.client().request(out_req))
            .await;

    let duration = start.elapsed().as_secs_f64();

    let error = match result {
        Ok(Ok(resp)) => {
            debug!(status = resp.status().as_u16(), duration, "backend responded");
            if let Some(m) = config.metrics {
                m.record_backend_response(duration);
            }
            let origin = config.origin.to_string();
            return Ok(resp.map(move |b| {
                b.map_err(move |e| {
                    warn!(backend = %origin, error = %e, "backend response body failed mid-stream");
                    e
                })
                .boxed()
            }));
        }
        Ok(Err(e)) => HttpError::FailedToGetResponseFromBackend(e.to_string()),
        Err(_) => HttpError::UpstreamTimeout(config.upstream_timeout),
    };

    if let Some(m) = config.metrics {
        m.record_backend_error(error.error_type());
    }
    Err(error)
}
