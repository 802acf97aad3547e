//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (from the public listener)
//!     → server.rs (Axum setup, request ID, tracing)
//!     → pipeline.rs (resolve peer, sanitize/inject headers)
//!     → forward.rs (retarget, send upstream, stream response back)
//!     → error.rs (map failures to 500/502/504)
//!     → Send to client
//! ```

pub mod error;
pub mod forward;
pub mod pipeline;
pub mod server;

pub use error::{ForwardError, ProxyError};
pub use forward::Forwarder;
pub use pipeline::{Pipeline, RequestOutcome};
pub use server::ProxyServer;
