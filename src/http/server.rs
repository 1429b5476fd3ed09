//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the origin handler
//! - Wire up middleware (request ID, tracing, lazy-load)
//! - Bind server to listener
//! - Stop on the shutdown signal, draining in-flight requests

use std::net::SocketAddr;

use axum::{middleware, routing::any, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::PageSpeedConfig;
use crate::http::middleware::{lazy_load_middleware, LazyLoadState};
use crate::http::origin::{origin_handler, OriginClient, OriginError};
use crate::lifecycle::shutdown;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub origin: OriginClient,
}

/// HTTP server for the lazy-load proxy.
pub struct HttpServer {
    router: Router,
    config: PageSpeedConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: PageSpeedConfig) -> Result<Self, ServerError> {
        let origin = OriginClient::new(&config.origin, &config.timeouts)?;
        let lazy_load = LazyLoadState::from_config(&config);

        tracing::info!(
            origin = %origin.authority(),
            routes = lazy_load.router.len(),
            lazy_load = lazy_load.enabled,
            crawler_bots = ?lazy_load.filter.crawler_bots().iter().collect::<Vec<_>>(),
            "Proxy configured"
        );
        if lazy_load.router.is_empty() {
            tracing::warn!("No routes configured; pages are proxied without rewriting");
        }

        let router = Self::build_router(AppState { origin }, lazy_load);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Request deadlines live on the origin call, inside the lazy-load layer,
    /// so a timed-out page still reaches AFTER as a failure.
    fn build_router(state: AppState, lazy_load: LazyLoadState) -> Router {
        Router::new()
            .route("/{*path}", any(origin_handler))
            .route("/", any(origin_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(lazy_load, lazy_load_middleware))
            .layer(
                // Outermost first.
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &PageSpeedConfig {
        &self.config
    }
}
