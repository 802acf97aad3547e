//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Public listener facility (TLS + edge auth, external)
//!     → listener.rs (bind the local address it delivers traffic to)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - The proxy never terminates TLS; it consumes an already-secured stream
//! - Any listener failure is fatal at startup

pub mod listener;

pub use listener::{bind, ListenerError};
