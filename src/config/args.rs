//! Command-line arguments.
//!
//! Flags override values from the optional config file, which in turn
//! override the built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::loader::{finalize, load_config, ConfigError};
use crate::config::schema::ProxyConfig;
use crate::config::upstream::UpstreamTarget;

#[derive(Debug, Parser)]
#[command(name = "ident-proxy")]
#[command(about = "Reverse proxy that asserts the caller's network identity to one upstream", long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Upstream base URL to proxy to (e.g. http://dex:5556).
    #[arg(short, long)]
    pub upstream: Option<String>,

    /// Hostname to register with the public listener.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Address to accept proxied traffic on.
    #[arg(long)]
    pub listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Unix socket of the local identity API.
    #[arg(long)]
    pub local_api_socket: Option<String>,
}

impl Args {
    /// Assemble and validate the effective configuration.
    pub fn into_config(self) -> Result<(ProxyConfig, UpstreamTarget), ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);
        finalize(config)
    }

    fn apply(self, config: &mut ProxyConfig) {
        if let Some(upstream) = self.upstream {
            config.upstream.url = upstream;
        }
        if let Some(hostname) = self.hostname {
            config.listener.hostname = hostname;
        }
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(socket) = self.local_api_socket {
            config.identity.socket_path = socket;
        }
    }
}
