//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → args.rs (command-line overrides)
//!     → validation.rs (semantic checks, parse upstream)
//!     → ProxyConfig + UpstreamTarget (validated, immutable)
//!     → moved into the request pipeline at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults except the upstream URL
//! - Validation separates syntactic (serde) from semantic checks

pub mod args;
pub mod loader;
pub mod schema;
pub mod upstream;
pub mod validation;

pub use args::Args;
pub use loader::ConfigError;
pub use schema::{
    DisplayNameSource, HeaderConfig, IdentityConfig, ListenerConfig, ObservabilityConfig,
    ProxyConfig, UpstreamConfig,
};
pub use upstream::UpstreamTarget;
