//! Per-request errors and their mapping to HTTP responses.
//!
//! - resolution failure → 500 with the resolver's message
//! - upstream timeout → 504
//! - any other upstream failure → 502 with a short diagnostic

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

use crate::identity::ResolutionError;

/// Failure of the upstream call.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Unreachable(#[source] hyper_util::client::legacy::Error),

    #[error("upstream response body failed: {0}")]
    Body(#[source] axum::Error),

    #[error("could not build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

/// Any error that ends a request before an upstream response is relayed.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Forward(#[from] ForwardError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Resolution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Forward(ForwardError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Forward(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Body sent to the caller: the error and its causes, without repeats.
    fn diagnostic(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.diagnostic()).into_response()
    }
}
