//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Hand every request to the pipeline with its peer address

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, UpstreamTarget};
use crate::http::forward::Forwarder;
use crate::http::pipeline::Pipeline;
use crate::identity::IdentityResolver;
use crate::security::HeaderPolicy;

/// HTTP server for the identity proxy.
pub struct ProxyServer<R> {
    router: Router,
    pipeline: Arc<Pipeline<R>>,
    hostname: String,
}

impl<R: IdentityResolver> ProxyServer<R> {
    /// Create a new server forwarding to `target`, resolving peers with `resolver`.
    pub fn new(config: &ProxyConfig, target: UpstreamTarget, resolver: R) -> Self {
        let forwarder = Forwarder::new(target, Duration::from_secs(config.upstream.timeout_secs));
        let policy = HeaderPolicy::new(&config.headers, &config.identity);
        let pipeline = Arc::new(Pipeline::new(resolver, policy, forwarder));

        let router = Self::build_router(pipeline.clone());
        Self {
            router,
            pipeline,
            hostname: config.listener.hostname.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(pipeline: Arc<Pipeline<R>>) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler::<R>))
            .route("/", any(proxy_handler::<R>))
            .with_state(pipeline)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            hostname = %self.hostname,
            upstream = %self.pipeline.forwarder().target(),
            timeout_secs = self.pipeline.forwarder().timeout().as_secs(),
            "Proxying requests"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every method, every path.
async fn proxy_handler<R: IdentityResolver>(
    State(pipeline): State<Arc<Pipeline<R>>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    pipeline.handle(peer, request).await
}
