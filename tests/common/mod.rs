//! Shared utilities for integration testing.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use ident_proxy::config::loader::finalize;
use ident_proxy::identity::ResolutionError;
use ident_proxy::{IdentityResolver, ProxyConfig, ProxyServer, ResolvedIdentity, Shutdown};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

/// What a [`StaticResolver`] answers for every peer.
#[derive(Debug, Clone)]
pub enum Answer {
    NotFound,
    Identity(ResolvedIdentity),
    Fail,
}

/// Resolver that gives the same answer to every peer and counts lookups.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    answer: Answer,
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl StaticResolver {
    pub fn new(answer: Answer) -> Self {
        Self {
            answer,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityResolver for StaticResolver {
    async fn resolve(&self, _peer: SocketAddr) -> Result<Option<ResolvedIdentity>, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Answer::NotFound => Ok(None),
            Answer::Identity(identity) => Ok(Some(identity.clone())),
            Answer::Fail => Err(ResolutionError::Transport("connection refused".to_string())),
        }
    }
}

/// What the echo upstream saw.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl Echo {
    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[allow(dead_code)]
    pub fn has_trusted_headers(&self) -> bool {
        self.headers.keys().any(|k| k.starts_with("x-remote-"))
    }
}

/// Mock upstream and its hit counter.
pub struct Upstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl Upstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn echo(
    State(hits): State<Arc<AtomicUsize>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    (
        [("x-upstream", "echo")],
        Json(Echo {
            method: method.to_string(),
            uri: uri.to_string(),
            headers: seen,
            body: String::from_utf8_lossy(&body).into_owned(),
        }),
    )
}

async fn status(State(hits): State<Arc<AtomicUsize>>, Path(code): Path<u16>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [("x-upstream-status", code.to_string())], format!("upstream says {code}"))
}

async fn redirect(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::FOUND, [("location", "/landing")], "")
}

async fn slow(State(hits): State<Arc<AtomicUsize>>, Path(millis): Path<u64>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    "finally"
}

async fn large(State(hits): State<Arc<AtomicUsize>>, Path(len): Path<usize>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>()
}

/// Start a mock upstream on an ephemeral port.
///
/// - `/status/{code}` answers with that status
/// - `/redirect` answers 302 to `/landing`
/// - `/slow/{millis}` sleeps before answering
/// - `/large/{len}` answers with `len` patterned bytes
/// - anything else echoes the request as JSON
pub async fn start_upstream() -> Upstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/status/{code}", any(status))
        .route("/redirect", any(redirect))
        .route("/slow/{millis}", any(slow))
        .route("/large/{len}", any(large))
        .route("/{*path}", any(echo))
        .route("/", any(echo))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Upstream { addr, hits }
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Upstream that serves a single connection with `serve`, bypassing HTTP
/// framing so tests can misbehave at the socket level.
#[allow(dead_code)]
pub async fn start_raw_upstream<F, Fut>(serve: F) -> SocketAddr
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream).await;
    });
    addr
}

/// Read from `stream` until the end of a request head.
#[allow(dead_code)]
pub async fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before request head");
        head.extend_from_slice(&buf[..n]);
    }
}

/// A running proxy.
pub struct Proxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl Proxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy in front of `upstream`.
pub async fn start_proxy(upstream: SocketAddr, resolver: StaticResolver, timeout_secs: u64) -> Proxy {
    let mut config = ProxyConfig::default();
    config.upstream.url = format!("http://{upstream}");
    config.upstream.timeout_secs = timeout_secs;
    let (config, target) = finalize(config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ProxyServer::new(&config, target, resolver);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Proxy { addr, shutdown }
}

/// Client that neither follows redirects nor uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
