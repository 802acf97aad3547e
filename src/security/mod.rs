//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (identity already resolved):
//!     → headers.rs (strip spoofable headers, assert resolved identity)
//!     → Pass to forwarder
//! ```
//!
//! # Design Decisions
//! - Fail closed: an identity that cannot be asserted cleanly is not asserted
//! - No trust in client input: the trusted namespace is only ever written here

pub mod headers;

pub use headers::{sanitize_and_inject, HeaderPolicy, SanitizeReport};
