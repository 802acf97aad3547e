//! Trusted identity header sanitization and injection.
//!
//! # Responsibilities
//! - Strip every caller-supplied header in the `X-Remote-` namespace
//! - Strip identity-transport signals that arrived as plain HTTP headers
//! - Strip caller-supplied `Forwarded`/`X-Forwarded-*` (configurable)
//! - Assert the resolved identity as `X-Remote-User-Email`, `X-Remote-User`, `X-Remote-User-Id`
//!
//! # Design Decisions
//! - `HeaderMap` keys are lowercase; all prefix checks run on lowercase names
//! - Stripping is unconditional and happens before injection
//! - Header absent means unauthenticated; there is no default identity
//! - Excluded-class identities are never asserted
//! - If any identity value is not a valid header value, nothing is asserted

use axum::http::header::{FORWARDED, HeaderMap, HeaderName, HeaderValue};

use crate::config::{DisplayNameSource, HeaderConfig, IdentityConfig};
use crate::identity::ResolvedIdentity;

/// Lowercase prefix of every header the proxy uses to assert identity.
pub const TRUSTED_HEADER_PREFIX: &str = "x-remote-";

pub const X_REMOTE_USER_EMAIL: HeaderName = HeaderName::from_static("x-remote-user-email");
pub const X_REMOTE_USER: HeaderName = HeaderName::from_static("x-remote-user");
pub const X_REMOTE_USER_ID: HeaderName = HeaderName::from_static("x-remote-user-id");

const FORWARDING_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "x-forwarded-host",
    "x-forwarded-proto",
    "x-forwarded-port",
    "x-real-ip",
];

/// Immutable sanitization policy, built once from configuration.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    internal_signal_prefixes: Vec<String>,
    strip_forwarded: bool,
    display_name_source: DisplayNameSource,
}

impl HeaderPolicy {
    pub fn new(headers: &HeaderConfig, identity: &IdentityConfig) -> Self {
        Self {
            internal_signal_prefixes: headers
                .internal_signal_prefixes
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            strip_forwarded: headers.strip_forwarded,
            display_name_source: identity.display_name_source,
        }
    }

    fn is_stripped(&self, name: &HeaderName) -> bool {
        let name = name.as_str();
        name.starts_with(TRUSTED_HEADER_PREFIX)
            || self.internal_signal_prefixes.iter().any(|p| name.starts_with(p.as_str()))
            || (self.strip_forwarded && (name == FORWARDED.as_str() || FORWARDING_HEADERS.contains(&name)))
    }

    fn display_value(&self, identity: &ResolvedIdentity) -> String {
        match self.display_name_source {
            DisplayNameSource::DisplayName if !identity.display_name.is_empty() => {
                identity.display_name.clone()
            }
            _ => identity.short_username(),
        }
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new(&HeaderConfig::default(), &IdentityConfig::default())
    }
}

/// What a sanitize pass did to one request's headers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Names removed because the caller is not allowed to set them.
    pub removed: Vec<HeaderName>,
    /// Whether the trusted headers now carry an identity.
    pub asserted: bool,
}

/// Strip spoofable headers, then assert `identity` if it is assertable.
pub fn sanitize_and_inject(
    headers: &mut HeaderMap,
    identity: Option<&ResolvedIdentity>,
    policy: &HeaderPolicy,
) -> SanitizeReport {
    let removed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| policy.is_stripped(name))
        .cloned()
        .collect();

    for name in &removed {
        headers.remove(name);
    }

    let asserted = match identity.filter(|id| id.is_assertable()) {
        Some(identity) => match trusted_values(identity, policy) {
            Some([email, user, id]) => {
                headers.insert(X_REMOTE_USER_EMAIL, email);
                headers.insert(X_REMOTE_USER, user);
                headers.insert(X_REMOTE_USER_ID, id);
                true
            }
            None => {
                tracing::warn!(
                    login = %identity.login_identifier,
                    "Identity is not representable as header values, forwarding anonymously"
                );
                false
            }
        },
        None => false,
    };

    SanitizeReport { removed, asserted }
}

fn trusted_values(identity: &ResolvedIdentity, policy: &HeaderPolicy) -> Option<[HeaderValue; 3]> {
    let email = HeaderValue::from_str(&identity.normalized_login()).ok()?;
    let user = HeaderValue::from_str(&policy.display_value(identity)).ok()?;
    let id = HeaderValue::from_str(&identity.subject_id).ok()?;
    Some([email, user, id])
}
