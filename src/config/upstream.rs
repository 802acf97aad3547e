//! The single upstream every request is forwarded to.

use axum::http::uri::{Authority, Scheme};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::config::validation::ValidationError;

/// Parsed, immutable upstream base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamTarget {
    /// Parse a `scheme://host[:port]` base URL.
    ///
    /// Only plain `http` is accepted: the upstream is an internal service and
    /// the proxy carries no TLS client. A trailing `/` is tolerated; any other
    /// path, query or fragment is rejected rather than silently dropped.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingUpstream);
        }

        let url = Url::parse(raw).map_err(|e| ValidationError::InvalidUpstream {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" {
            return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url.host_str().ok_or_else(|| ValidationError::InvalidUpstream {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        })?;

        if !matches!(url.path(), "" | "/") || url.query().is_some() || url.fragment().is_some() {
            return Err(ValidationError::InvalidUpstream {
                url: raw.to_string(),
                reason: "must not carry a path, query or fragment".to_string(),
            });
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(ValidationError::InvalidUpstream {
                url: raw.to_string(),
                reason: "must not carry credentials".to_string(),
            });
        }

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority).map_err(|e| ValidationError::InvalidUpstream {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let target = UpstreamTarget::parse("http://dex:5556").unwrap();
        assert_eq!(target.authority().as_str(), "dex:5556");
        assert_eq!(target.scheme(), &Scheme::HTTP);
        assert_eq!(target.to_string(), "http://dex:5556");
    }

    #[test]
    fn test_parse_trailing_slash() {
        let target = UpstreamTarget::parse("http://127.0.0.1:3000/").unwrap();
        assert_eq!(target.authority().as_str(), "127.0.0.1:3000");
    }

    #[test]
    fn test_default_port_elided() {
        let target = UpstreamTarget::parse("http://backend").unwrap();
        assert_eq!(target.authority().as_str(), "backend");
    }

    #[test]
    fn test_ipv6_host() {
        let target = UpstreamTarget::parse("http://[::1]:8080").unwrap();
        assert_eq!(target.authority().as_str(), "[::1]:8080");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(UpstreamTarget::parse(""), Err(ValidationError::MissingUpstream));
        assert_eq!(
            UpstreamTarget::parse("https://dex"),
            Err(ValidationError::UnsupportedScheme("https".to_string()))
        );
        assert!(UpstreamTarget::parse("not a url").is_err());
        assert!(UpstreamTarget::parse("http://dex/prefix").is_err());
        assert!(UpstreamTarget::parse("http://dex/?a=b").is_err());
        assert!(UpstreamTarget::parse("http://user:pw@dex").is_err());
    }
}
