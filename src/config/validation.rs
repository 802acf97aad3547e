//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse the upstream URL into an `UpstreamTarget`
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<UpstreamTarget, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::upstream::UpstreamTarget;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream url must be set")]
    MissingUpstream,

    #[error("upstream url {url:?} is invalid: {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("upstream scheme {0:?} is not supported (expected http)")]
    UnsupportedScheme(String),

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("{field} {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
}

/// Validate the configuration, returning the parsed upstream on success.
pub fn validate_config(config: &ProxyConfig) -> Result<UpstreamTarget, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target = UpstreamTarget::parse(&config.upstream.url)
        .map_err(|e| errors.push(e))
        .ok();

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "upstream.timeout_secs" });
    }
    if config.identity.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "identity.timeout_secs" });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    match target {
        Some(target) if errors.is_empty() => Ok(target),
        _ => Err(errors),
    }
}
