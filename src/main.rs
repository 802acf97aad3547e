//! Identity-asserting reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                    IDENT PROXY                        │
//!   Public listener  │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ─────────────────┼─▶│   net   │───▶│   http   │───▶│    identity    │◀──┼── local API
//!                    │  │listener │    │  server  │    │ whois resolver │   │   (unix socket)
//!                    │  └─────────┘    └──────────┘    └───────┬────────┘   │
//!                    │                                         ▼            │
//!                    │                                 ┌────────────────┐   │
//!                    │                                 │    security    │   │
//!                    │                                 │ strip + inject │   │
//!                    │                                 └───────┬────────┘   │
//!                    │                                         ▼            │
//!   Client Response  │                                 ┌────────────────┐   │
//!   ◀────────────────┼─────────────────────────────────│   forwarder    │───┼──▶ Upstream
//!                    │                                 └────────────────┘   │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use ident_proxy::config::Args;
use ident_proxy::identity::LocalApiResolver;
use ident_proxy::lifecycle::{signals, Shutdown};
use ident_proxy::observability::{logging, metrics};
use ident_proxy::{net, ProxyServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, target) = Args::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("ident-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses when metrics are enabled.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let resolver = LocalApiResolver::new(&config.identity);
    tracing::info!(
        socket = %resolver.socket_path().display(),
        timeout_secs = config.identity.timeout_secs,
        "Identity resolver configured"
    );

    let listener = net::bind(&config.listener).await?;
    let server = ProxyServer::new(&config, target, resolver);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::trigger_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
