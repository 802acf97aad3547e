//! The per-request pipeline: resolve → sanitize/inject → forward.
//!
//! # State Machine
//! ```text
//! Received → Resolved → Sanitized → Forwarding → Completed
//!     │                                 ├──────→ TimedOut
//!     │                                 └──────→ UpstreamUnreachable
//!     └──────────────────────────────────────→ ResolutionFailed
//! ```
//! Every terminal state is reported once; there are no retries.

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use crate::http::error::{ForwardError, ProxyError};
use crate::http::forward::Forwarder;
use crate::identity::IdentityResolver;
use crate::observability::metrics;
use crate::security::{sanitize_and_inject, HeaderPolicy};

/// Terminal state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Completed,
    TimedOut,
    UpstreamUnreachable,
    ResolutionFailed,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Completed => "completed",
            RequestOutcome::TimedOut => "timed_out",
            RequestOutcome::UpstreamUnreachable => "upstream_unreachable",
            RequestOutcome::ResolutionFailed => "resolution_failed",
        }
    }

    fn of(err: &ProxyError) -> Self {
        match err {
            ProxyError::Resolution(_) => RequestOutcome::ResolutionFailed,
            ProxyError::Forward(ForwardError::Timeout(_)) => RequestOutcome::TimedOut,
            ProxyError::Forward(_) => RequestOutcome::UpstreamUnreachable,
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built once at startup and shared by every request.
///
/// Holds no per-request state; everything about a request arrives as
/// arguments to [`Pipeline::handle`].
pub struct Pipeline<R> {
    resolver: R,
    policy: HeaderPolicy,
    forwarder: Forwarder,
}

impl<R: IdentityResolver> Pipeline<R> {
    pub fn new(resolver: R, policy: HeaderPolicy, forwarder: Forwarder) -> Self {
        Self {
            resolver,
            policy,
            forwarder,
        }
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Handle one request from `peer` end to end.
    pub async fn handle(&self, peer: SocketAddr, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %request.uri(),
            remote_addr = %peer,
            "Proxying request"
        );

        let (response, outcome) = match self.run(peer, request, &request_id).await {
            Ok(response) => (response, RequestOutcome::Completed),
            Err(err) => {
                let outcome = RequestOutcome::of(&err);
                tracing::error!(
                    request_id = %request_id,
                    outcome = %outcome,
                    error = %err,
                    "Request failed"
                );
                (err.into_response(), outcome)
            }
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), outcome.as_str(), start);
        response
    }

    async fn run(
        &self,
        peer: SocketAddr,
        request: Request<Body>,
        request_id: &str,
    ) -> Result<Response, ProxyError> {
        let identity = self.resolver.resolve(peer).await.inspect_err(|_| {
            metrics::record_resolution(metrics::ResolutionResult::Error);
        })?;
        tracing::debug!(request_id = %request_id, whois = ?identity, "Resolved peer identity");

        let (mut parts, body) = request.into_parts();
        let report = sanitize_and_inject(&mut parts.headers, identity.as_ref(), &self.policy);

        for name in &report.removed {
            tracing::info!(request_id = %request_id, key = %name, "Removing spoofed header");
        }
        if !report.removed.is_empty() {
            metrics::record_spoofed_headers(report.removed.len());
        }
        metrics::record_resolution(match (&identity, report.asserted) {
            (_, true) => metrics::ResolutionResult::Asserted,
            (Some(id), false) if id.is_excluded_class => metrics::ResolutionResult::Excluded,
            _ => metrics::ResolutionResult::Anonymous,
        });

        let response = self.forwarder.forward(Request::from_parts(parts, body)).await?;
        Ok(response.into_response())
    }
}
