//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the identity proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, advertised hostname).
    pub listener: ListenerConfig,

    /// The single upstream every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Peer identity resolution settings.
    pub identity: IdentityConfig,

    /// Inbound header sanitization policy.
    pub headers: HeaderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Name this proxy registers under with the public-listener facility.
    pub hostname: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            hostname: "ident-proxy".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream (`scheme://host[:port]`). Required.
    pub url: String,

    /// Deadline for the upstream to produce a response head, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 60,
        }
    }
}

/// Which value is asserted in `X-Remote-User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayNameSource {
    /// The profile display name, falling back to the short login when empty.
    #[default]
    DisplayName,
    /// Always the login identifier up to its first `@`.
    LoginShort,
}

/// Identity resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Unix socket of the local identity API.
    pub socket_path: String,

    /// Deadline for a single whois lookup, in seconds.
    pub timeout_secs: u64,

    /// Sentinel logins that stand for a pool of indistinguishable callers.
    pub excluded_logins: Vec<String>,

    /// Source of the `X-Remote-User` value.
    pub display_name_source: DisplayNameSource,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            socket_path: "/var/run/tailscale/tailscaled.sock".to_string(),
            timeout_secs: 5,
            excluded_logins: vec!["tagged-devices".to_string()],
            display_name_source: DisplayNameSource::DisplayName,
        }
    }
}

/// Header sanitization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Drop caller-supplied `Forwarded`/`X-Forwarded-*`/`X-Real-Ip`.
    pub strip_forwarded: bool,

    /// Header name prefixes reserved for the identity transport.
    pub internal_signal_prefixes: Vec<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            strip_forwarded: true,
            internal_signal_prefixes: vec!["tailscale-".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
