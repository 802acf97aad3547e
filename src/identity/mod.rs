//! Peer identity resolution subsystem.
//!
//! # Data Flow
//! ```text
//! peer SocketAddr
//!     → resolver.rs (IdentityResolver trait)
//!     → local_api.rs (whois over the identity daemon's Unix socket)
//!     → types.rs (ResolvedIdentity, or None for an unknown peer)
//! ```
//!
//! # Design Decisions
//! - "Peer not found" is a successful, anonymous result, never an error
//! - Lookups carry their own deadline, independent of the upstream timeout
//! - Excluded-class identities are produced but flagged, never asserted

pub mod local_api;
pub mod resolver;
pub mod types;

pub use local_api::LocalApiResolver;
pub use resolver::{IdentityResolver, ResolutionError};
pub use types::ResolvedIdentity;
