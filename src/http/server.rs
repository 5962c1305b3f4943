//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the upload and health handlers
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::http::health::health;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::timeout::enforce_deadline;
use crate::lifecycle::startup::StartupError;
use crate::relay::{process_image, DownstreamClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub downstream: DownstreamClient,
    pub field_name: Arc<str>,
    pub upload_dir: Arc<PathBuf>,
}

/// HTTP server for the image relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, StartupError> {
        let downstream =
            DownstreamClient::from_config(&config.downstream, &config.upload.field_name)?;

        let state = AppState {
            downstream,
            field_name: Arc::from(config.upload.field_name.as_str()),
            upload_dir: Arc::new(config.upload.directory.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route(&config.upload.route, post(process_image))
            .route("/health", get(health))
            .layer(DefaultBodyLimit::max(config.upload.max_body_bytes))
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                Duration::from_secs(config.timeouts.request_secs),
                enforce_deadline,
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain open requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            route = %self.config.upload.route,
            downstream = %self.config.downstream.url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
