//! Server Module
//!
//! HTTP front end for the chatbot: ingest and ask endpoints plus health and
//! metrics, served with axum on a tokio listener.

mod config;
mod error;
mod handler;

pub use config::ServerConfig;
pub use error::ApiError;
pub use handler::{AskResponse, HealthResponse};

use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::metrics::Metrics;
use crate::observability::{HealthCheck, HealthStatus};
use crate::rag::RagOrchestrator;
use crate::storage::WriteHealth;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub(crate) rag: RagOrchestrator,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) health: Arc<HealthCheck>,
    /// Fires on shutdown; in-flight asks are cancelled through child tokens
    pub(crate) shutdown: CancellationToken,
}

impl AppState {
    pub fn new(rag: RagOrchestrator) -> Self {
        let mut health = HealthCheck::new();
        let store = rag.store().clone();
        health.register("store", move || {
            let records = store.len();
            match store.write_health() {
                WriteHealth::Ok => (HealthStatus::Healthy, Some(format!("{} records", records))),
                WriteHealth::LastAppendFailed(e) => {
                    (HealthStatus::Degraded, Some(format!("last append failed: {}", e)))
                }
                WriteHealth::ReadOnly(e) => (HealthStatus::Unhealthy, Some(format!("appends refused: {}", e))),
            }
        });

        Self {
            rag,
            metrics: Arc::new(Metrics::new()),
            health: Arc::new(health),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

/// Route table for the chatbot API
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chatbot/embedding", post(handler::embed_message))
        .route("/chatbot/ask", post(handler::ask_question))
        .route("/health", get(handler::health))
        .route("/metrics", get(handler::metrics))
        .with_state(state)
}

/// Chatbot HTTP server
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        let listener = TcpListener::bind(addr).await?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!("Chatbot server listening on {}", addr);

        let token = self.state.shutdown.clone();
        let metrics = self.state.metrics.clone();
        let app = build_router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                token.cancel();
            })
            .await?;

        info!("Server shutdown complete. {}", metrics.summary());
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
