//! Whois lookups against the identity daemon's local API.
//!
//! The daemon serves HTTP/1.1 on a Unix domain socket. Each lookup opens a
//! fresh connection, asks `GET /localapi/v0/whois?addr=<ip:port>`, and maps:
//! - `200` → the peer's profile
//! - `404` → peer is not on the network (anonymous)
//! - anything else → `ResolutionError`

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixStream;

use crate::config::IdentityConfig;
use crate::identity::resolver::{IdentityResolver, ResolutionError};
use crate::identity::types::ResolvedIdentity;

const LOCAL_API_HOST: &str = "local-tailscaled.sock";
const WHOIS_PATH: &str = "/localapi/v0/whois";
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
const MAX_ERROR_BODY_CHARS: usize = 256;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WhoIsResponse {
    node: Option<WhoIsNode>,
    user_profile: Option<WhoIsUserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WhoIsNode {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WhoIsUserProfile {
    #[serde(rename = "ID")]
    id: serde_json::Value,
    login_name: String,
    #[serde(default)]
    display_name: String,
}

/// Resolver backed by the local identity daemon.
#[derive(Debug, Clone)]
pub struct LocalApiResolver {
    socket_path: PathBuf,
    timeout: Duration,
    excluded_logins: Vec<String>,
}

impl LocalApiResolver {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            socket_path: PathBuf::from(&config.socket_path),
            timeout: Duration::from_secs(config.timeout_secs),
            excluded_logins: config.excluded_logins.clone(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn whois(&self, peer: SocketAddr) -> Result<Option<ResolvedIdentity>, ResolutionError> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            ResolutionError::Transport(format!("connect {}: {e}", self.socket_path.display()))
        })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "Local API connection closed with error");
            }
        });

        let addr: String = url::form_urlencoded::byte_serialize(peer.to_string().as_bytes()).collect();
        let request = Request::get(format!("{WHOIS_PATH}?addr={addr}"))
            .header(header::HOST, LOCAL_API_HOST)
            .body(Body::empty())
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;

        self.decode(status, &body)
    }

    fn decode(&self, status: StatusCode, body: &[u8]) -> Result<Option<ResolvedIdentity>, ResolutionError> {
        match status {
            StatusCode::OK => {
                let response: WhoIsResponse = serde_json::from_slice(body)
                    .map_err(|e| ResolutionError::Malformed(e.to_string()))?;
                self.to_identity(response).map(Some)
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(ResolutionError::Status {
                status,
                body: String::from_utf8_lossy(body)
                    .trim()
                    .chars()
                    .take(MAX_ERROR_BODY_CHARS)
                    .collect(),
            }),
        }
    }

    fn to_identity(&self, response: WhoIsResponse) -> Result<ResolvedIdentity, ResolutionError> {
        let profile = response
            .user_profile
            .ok_or_else(|| ResolutionError::Malformed("missing UserProfile".to_string()))?;

        let subject_id = match profile.id {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) if !s.is_empty() => s,
            other => return Err(ResolutionError::Malformed(format!("unexpected user ID {other}"))),
        };

        if profile.login_name.is_empty() {
            return Err(ResolutionError::Malformed("empty LoginName".to_string()));
        }

        let tagged = response
            .node
            .as_ref()
            .and_then(|node| node.tags.as_ref())
            .is_some_and(|tags| !tags.is_empty());
        let sentinel = self
            .excluded_logins
            .iter()
            .any(|login| login.eq_ignore_ascii_case(&profile.login_name));

        if let Some(node) = &response.node {
            tracing::debug!(node = %node.name, tags = ?node.tags, "Resolved peer node");
        }

        let identity = ResolvedIdentity::new(profile.login_name, profile.display_name, subject_id);
        Ok(if tagged || sentinel { identity.excluded() } else { identity })
    }
}

impl IdentityResolver for LocalApiResolver {
    async fn resolve(&self, peer: SocketAddr) -> Result<Option<ResolvedIdentity>, ResolutionError> {
        match tokio::time::timeout(self.timeout, self.whois(peer)).await {
            Ok(result) => result,
            Err(_) => Err(ResolutionError::Timeout(self.timeout)),
        }
    }
}
