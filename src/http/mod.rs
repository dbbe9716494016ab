use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::cleanup;
use crate::config::ServerConfig;
use crate::formats::StorageArea;
use crate::pipeline::Compressor;
use crate::video::VideoEncoder;

mod error;
mod handlers;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub compressor: Compressor,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, video: Arc<dyn VideoEncoder>) -> Self {
        Self {
            compressor: Compressor::new(config.store(), video),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/compress", post(handlers::compress))
        .route("/download/:area/:filename", get(handlers::download))
        .route("/cleanup", post(handlers::cleanup))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn download_url(area: StorageArea, name: &str) -> String {
    format!("/download/{}/{}", area.as_str(), name)
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = config.store();
    store.ensure_dirs()?;

    let encoder = Arc::new(config.encoder());
    let bind_addr = config.bind_addr;

    let sweeper = config
        .cleanup_interval
        .map(|interval| cleanup::spawn_periodic(store.clone(), config.retention, interval));

    let app = router(AppState::new(config, encoder));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
