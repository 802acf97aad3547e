//! Resolved identity of a peer.

/// Verified identity of a peer, as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Login as reported (e.g. `Alice@Example.com`). Not yet normalized.
    pub login_identifier: String,
    /// Human-readable name; may be empty.
    pub display_name: String,
    /// Opaque, stable subject identifier.
    pub subject_id: String,
    /// Shared identity standing for many indistinguishable callers.
    pub is_excluded_class: bool,
}

impl ResolvedIdentity {
    pub fn new(
        login_identifier: impl Into<String>,
        display_name: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            login_identifier: login_identifier.into(),
            display_name: display_name.into(),
            subject_id: subject_id.into(),
            is_excluded_class: false,
        }
    }

    /// Mark this identity as belonging to the excluded class.
    pub fn excluded(mut self) -> Self {
        self.is_excluded_class = true;
        self
    }

    /// Lowercased login, the form asserted to the upstream.
    pub fn normalized_login(&self) -> String {
        self.login_identifier.to_lowercase()
    }

    /// Lowercased login up to its first `@`.
    pub fn short_username(&self) -> String {
        let login = self.normalized_login();
        match login.split_once('@') {
            Some((user, _)) => user.to_string(),
            None => login,
        }
    }

    /// Whether this identity may be asserted via trusted headers.
    pub fn is_assertable(&self) -> bool {
        !self.is_excluded_class
    }
}
