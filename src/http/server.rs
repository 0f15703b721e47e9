//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request timeout)
//! - Serve until shutdown is signalled

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::custody::service::CustodyService;
use crate::http::handlers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CustodyService>,
}

/// HTTP server for the custody API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over the custody service.
    pub fn new(service: Arc<CustodyService>, config: &ServiceConfig) -> Self {
        let state = AppState { service };

        let router = Router::new()
            .route("/wallet", post(handlers::create_wallet))
            .route("/wallet/{address}/transfer", post(handlers::send_funds))
            .route("/wallets", get(handlers::list_wallets))
            .route("/wallets/{hash}", get(handlers::get_wallet))
            .route("/operator", get(handlers::operator_status))
            .route("/health", get(handlers::health))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .with_state(state);

        Self { router }
    }

    /// Serve requests until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await
    }
}
