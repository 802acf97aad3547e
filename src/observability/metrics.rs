//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//!   (extension methods are folded into `other`)
//! - `proxy_request_duration_seconds` (histogram): latency by method, outcome
//! - `proxy_spoofed_headers_total` (counter): stripped caller headers (unlabelled: names are caller-controlled)
//! - `proxy_identity_resolutions_total` (counter): asserted, anonymous, excluded, error

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// How a request's identity ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionResult {
    Asserted,
    Anonymous,
    Excluded,
    Error,
}

impl ResolutionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionResult::Asserted => "asserted",
            ResolutionResult::Anonymous => "anonymous",
            ResolutionResult::Excluded => "excluded",
            ResolutionResult::Error => "error",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Label value for `method`, bounded to the standard methods.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "other",
    }
}

pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let method = method_label(method);
    counter!(
        "proxy_requests_total",
        "method" => method,
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "outcome" => outcome
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_spoofed_headers(count: usize) {
    counter!("proxy_spoofed_headers_total").increment(count as u64);
}

pub fn record_resolution(result: ResolutionResult) {
    counter!("proxy_identity_resolutions_total", "result" => result.as_str()).increment(1);
}
