//! The identity resolution seam.

use axum::http::StatusCode;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::identity::types::ResolvedIdentity;

/// Failure of the resolution mechanism itself.
///
/// An unknown peer is not a failure; resolvers return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("identity service unreachable: {0}")]
    Transport(String),

    #[error("identity lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("identity service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed identity response: {0}")]
    Malformed(String),
}

/// Maps a peer's network address to its verified identity.
///
/// Implementations are shared by every in-flight request and must be safe
/// for concurrent use.
pub trait IdentityResolver: Send + Sync + 'static {
    fn resolve(
        &self,
        peer: SocketAddr,
    ) -> impl Future<Output = Result<Option<ResolvedIdentity>, ResolutionError>> + Send;
}
