//! Upstream forwarding.
//!
//! # Responsibilities
//! - Retarget the request at the configured upstream (scheme, authority, Host)
//! - Drop server-side artifacts: inbound HTTP version, hop-by-hop headers
//! - Enforce the upstream deadline
//! - Relay status, headers and a streamed body back unchanged
//!
//! # Design Decisions
//! - Redirects are never followed; a 3xx is relayed as-is
//! - One deadline covers the whole exchange, response body included
//! - No retries: every failure is reported once

use axum::body::Body;
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, Version};
use futures_util::{stream, StreamExt, TryStreamExt};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::UpstreamTarget;
use crate::http::error::ForwardError;
use crate::security::headers::TRUSTED_HEADER_PREFIX;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Relays requests to the single upstream.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    target: UpstreamTarget,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(target: UpstreamTarget, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            target,
            timeout,
        }
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` upstream and relay whatever comes back.
    ///
    /// Dropping the returned future cancels the upstream call. The deadline
    /// keeps running while the body streams; a body still unfinished when it
    /// passes is cut short.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let request = self.rewrite(request)?;
        let deadline = Instant::now() + self.timeout;

        let response = match tokio::time::timeout_at(deadline, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ForwardError::Unreachable(e)),
            Err(_) => return Err(ForwardError::Timeout(self.timeout)),
        };

        // The status line is committed once this response is returned; a
        // failure mid-body can only be logged.
        let (parts, body) = response.into_parts();
        let body = bounded_body(Body::new(body), deadline, self.timeout)
            .inspect_err(|e| tracing::error!(error = %e, "Reading upstream response body"));

        Ok(Response::from_parts(parts, Body::from_stream(body)))
    }

    fn rewrite(&self, request: Request<Body>) -> Result<Request<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        parts.uri = Uri::builder()
            .scheme(self.target.scheme().clone())
            .authority(self.target.authority().clone())
            .path_and_query(path_and_query)
            .build()?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        let host = HeaderValue::from_str(self.target.authority().as_str()).map_err(axum::http::Error::from)?;
        parts.headers.insert(header::HOST, host);

        Ok(Request::from_parts(parts, body))
    }
}

/// Data frames of `body`, ending with an error once `deadline` passes.
fn bounded_body(
    body: Body,
    deadline: Instant,
    timeout: Duration,
) -> impl futures_util::Stream<Item = Result<axum::body::Bytes, ForwardError>> + Send + 'static {
    let frames = Box::pin(body.into_data_stream());
    stream::unfold(Some(frames), move |state| async move {
        let mut frames = state?;
        match tokio::time::timeout_at(deadline, frames.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(frames))),
            Ok(Some(Err(e))) => Some((Err(ForwardError::Body(e)), None)),
            Ok(None) => None,
            Err(_) => Some((Err(ForwardError::Timeout(timeout)), None)),
        }
    })
}

/// Remove hop-by-hop headers, including any named by `Connection`.
///
/// `Connection` cannot be used to drop the trusted identity headers.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .filter(|name| !name.as_str().starts_with(TRUSTED_HEADER_PREFIX))
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder() -> Forwarder {
        let target = UpstreamTarget::parse("http://dex:5556").unwrap();
        Forwarder::new(target, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_rewrite_retargets_request() {
        let request = Request::builder()
            .uri("/auth/callback?code=abc")
            .version(Version::HTTP_2)
            .header("host", "proxy.example.com")
            .body(Body::empty())
            .unwrap();

        let request = forwarder().rewrite(request).unwrap();
        assert_eq!(request.uri().to_string(), "http://dex:5556/auth/callback?code=abc");
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.headers().get(header::HOST).unwrap(), "dex:5556");
    }

    #[tokio::test]
    async fn test_rewrite_absolute_form() {
        let request = Request::builder()
            .uri("http://elsewhere.example.com:9999")
            .body(Body::empty())
            .unwrap();

        let request = forwarder().rewrite(request).unwrap();
        assert_eq!(request.uri().to_string(), "http://dex:5556/");
    }

    #[tokio::test]
    async fn test_bounded_body_passes_complete_body() {
        let body = Body::from("hello upstream");
        let deadline = Instant::now() + Duration::from_secs(5);

        let chunks: Vec<_> = bounded_body(body, deadline, Duration::from_secs(5)).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().as_ref(), b"hello upstream");
    }

    #[tokio::test]
    async fn test_bounded_body_cut_at_deadline() {
        let stalled = stream::iter(vec![Ok::<_, std::io::Error>(axum::body::Bytes::from_static(b"partial"))])
            .chain(stream::pending());
        let timeout = Duration::from_millis(100);

        let started = Instant::now();
        let chunks: Vec<_> = bounded_body(Body::from_stream(stalled), started + timeout, timeout)
            .collect()
            .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref().unwrap().as_ref(), b"partial");
        assert!(matches!(chunks[1], Err(ForwardError::Timeout(d)) if d == timeout));
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, X-Debug, x-remote-user-id"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-debug", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert("x-remote-user-id", HeaderValue::from_static("u-123"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-remote-user-id").unwrap(), "u-123");
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "*/*");
    }
}
