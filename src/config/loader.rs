//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::upstream::UpstreamTarget;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a TOML configuration file without validating it.
///
/// Command-line overrides are applied on top before [`finalize`] runs.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate a fully-assembled configuration.
pub fn finalize(config: ProxyConfig) -> Result<(ProxyConfig, UpstreamTarget), ConfigError> {
    let target = validate_config(&config).map_err(ConfigError::Validation)?;
    Ok((config, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/ident-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_and_finalize() {
        let path = std::env::temp_dir().join(format!("ident-proxy-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "[upstream]\nurl = \"http://127.0.0.1:5556\"\ntimeout_secs = 10\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);
        let (config, target) = finalize(config).unwrap();

        assert_eq!(config.upstream.timeout_secs, 10);
        assert_eq!(target.authority().as_str(), "127.0.0.1:5556");
    }

    #[test]
    fn test_parse_error() {
        let path = std::env::temp_dir().join(format!("ident-proxy-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[upstream\nurl = 1").unwrap();

        let err = load_config(&path).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validation_message_lists_errors() {
        let err = finalize(ProxyConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "validation failed: upstream url must be set");
    }
}
