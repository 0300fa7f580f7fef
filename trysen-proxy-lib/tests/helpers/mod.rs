//! Shared test helpers: TLS material, an echo backend and a proxy started in-process
#![allow(dead_code)]

use std::convert::Infallible;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Frame, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use trysen_proxy_lib::config::load_from_str;
use trysen_proxy_lib::{AdmissionController, Config, ProxyServer, Shutdown};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Generate a temporary file path for testing
pub fn tmp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_nanos();
    std::env::temp_dir().join(format!("trysen-test-{nanos}-{name}"))
}

/// Self-signed certificate for `localhost`, written as separate PEM files
pub struct TestCert {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_der: rustls_pki_types::CertificateDer<'static>,
}

pub fn create_valid_test_cert() -> Result<TestCert, BoxError> {
    let cert_path = tmp_path("test.crt");
    let key_path = tmp_path("test.key");

    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;

    fs::write(&cert_path, cert.pem())?;
    fs::write(&key_path, signing_key.serialize_pem())?;

    Ok(TestCert { cert_path, key_path, cert_der: cert.der().clone() })
}

/// Certificate and key concatenated in one PEM file
pub fn create_combined_test_pem() -> Result<PathBuf, BoxError> {
    let path = tmp_path("combined.pem");
    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
    fs::write(&path, format!("{}{}", cert.pem(), signing_key.serialize_pem()))?;
    Ok(path)
}

/// What the echo backend saw
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Body fed through a channel, ends when every sender is dropped
pub struct ChannelBody {
    rx: mpsc::Receiver<Result<Bytes, BoxError>>,
}

impl ChannelBody {
    pub fn new(buffer: usize) -> (mpsc::Sender<Result<Bytes, BoxError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        self.rx
            .poll_recv(cx)
            .map(|item| item.map(|chunk| chunk.map(Frame::data)))
    }
}

type EchoBody = BoxBody<Bytes, BoxError>;

/// Response body behaviour selected by the `x-echo-mode` request header
pub const ECHO_MODE: &str = "x-echo-mode";
/// `first` now, `second` after 1.5s
pub const MODE_TRICKLE: &str = "trickle";
/// `partial`, then a body error
pub const MODE_CUT: &str = "cut";
/// A chunk every 50ms for 10s, counting in `aborted` when the reader went away
pub const MODE_DRIP: &str = "drip";

#[derive(Default)]
struct BackendState {
    requests: Mutex<Vec<RecordedRequest>>,
    heads: AtomicUsize,
    aborted: AtomicUsize,
}

/// Hyper backend that records every request and answers `echo <method> <path>`.
///
/// Paths starting with `/slow` are answered after two seconds, `/created` gets a `201`.
/// Streaming bodies are available through [`ECHO_MODE`].
pub struct EchoBackend {
    pub addr: SocketAddr,
    state: Arc<BackendState>,
    handle: JoinHandle<()>,
}

impl EchoBackend {
    pub async fn start() -> Result<Self, BoxError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(BackendState::default());

        let shared = state.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let shared = shared.clone();
                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let shared = shared.clone();
                        async move { Ok::<_, Infallible>(echo(req, shared).await) }
                    });
                    let _ = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        Ok(Self { addr, state, handle })
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests whose body was read completely
    pub fn received(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Requests whose head arrived, body complete or not
    pub fn heads(&self) -> usize {
        self.state.heads.load(Ordering::SeqCst)
    }

    /// Drip responses abandoned by the reader
    pub fn aborted(&self) -> usize {
        self.state.aborted.load(Ordering::SeqCst)
    }
}

impl Drop for EchoBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn full_body(bytes: impl Into<Bytes>) -> EchoBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

fn streamed_body(mode: &str, state: Arc<BackendState>) -> EchoBody {
    let (tx, body) = ChannelBody::new(4);
    let mode = mode.to_string();
    tokio::spawn(async move {
        match mode.as_str() {
            MODE_TRICKLE => {
                let _ = tx.send(Ok(Bytes::from_static(b"first"))).await;
                tokio::time::sleep(Duration::from_millis(1500)).await;
                let _ = tx.send(Ok(Bytes::from_static(b"second"))).await;
            }
            MODE_CUT => {
                let _ = tx.send(Ok(Bytes::from_static(b"partial"))).await;
                tokio::time::sleep(Duration::from_millis(100)).await;
                let _ = tx.send(Err("backend gave up".into())).await;
            }
            _ => {
                for _ in 0..200 {
                    if tx.send(Ok(Bytes::from_static(b"drip\n"))).await.is_err() {
                        state.aborted.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    });
    body.boxed()
}

async fn echo(req: Request<Incoming>, state: Arc<BackendState>) -> Response<EchoBody> {
    state.heads.fetch_add(1, Ordering::SeqCst);
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    let mode = parts
        .headers
        .get(ECHO_MODE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if path_and_query.starts_with("/slow") {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    let text = format!("echo {} {}", parts.method, path_and_query);
    if let Ok(mut r) = state.requests.lock() {
        r.push(RecordedRequest {
            method: parts.method,
            path_and_query: path_and_query.clone(),
            headers: parts.headers,
            body,
        });
    }

    let body = match mode {
        Some(mode) => streamed_body(&mode, state.clone()),
        None => full_body(text),
    };
    let status =
        if path_and_query.starts_with("/created") { StatusCode::CREATED } else { StatusCode::OK };
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert("x-echo-backend", http::HeaderValue::from_static("1"));
    resp
}

/// Proxy configuration on an ephemeral port in front of `origin`.
///
/// Defaults apply except for a one second hold delay.
pub fn proxy_config(origin: &str) -> Result<Config, BoxError> {
    let toml = format!(
        r#"
listen = "127.0.0.1:0"

[backend]
origin = "{origin}"

[admission]
hold_delay_secs = 1
"#
    );
    Ok(load_from_str(&toml)?)
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub admission: Arc<AdmissionController>,
    pub handle: JoinHandle<trysen_proxy_lib::Result<()>>,
}

impl RunningProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Trigger shutdown and wait for the server to stop
    pub async fn stop(self) -> Result<(), BoxError> {
        self.shutdown.trigger("test");
        tokio::time::timeout(Duration::from_secs(10), self.handle).await???;
        Ok(())
    }
}

pub async fn start_proxy(config: Config) -> Result<RunningProxy, BoxError> {
    let server = ProxyServer::bind(Arc::new(config)).await?;
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    let admission = server.admission();
    let handle = tokio::spawn(server.serve());
    Ok(RunningProxy { addr, shutdown, admission, handle })
}

/// reqwest client that ignores proxy environment variables
pub fn http_client() -> Result<reqwest::Client, BoxError> {
    Ok(reqwest::Client::builder().no_proxy().build()?)
}

/// Poll `cond` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// Log lines at `warn` and above emitted on the current thread while the guard is alive
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut out) = self.0.lock() {
            out.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|out| String::from_utf8_lossy(&out).into_owned())
            .unwrap_or_default()
    }
}
