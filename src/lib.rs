//! Identity-asserting reverse proxy library.
//!
//! Every request is resolved to the caller's network identity, scrubbed of
//! any identity headers the caller tried to supply, stamped with the verified
//! identity, and forwarded to a single upstream.

pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::{ProxyConfig, UpstreamTarget};
pub use http::ProxyServer;
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use lifecycle::Shutdown;
