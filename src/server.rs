//! Router, shared state and the server entry point.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::downloader::{FileLifecycleManager, MediaEngine};
use crate::handlers::{download, get_info, health, index};
use crate::ytdlp::YtDlpEngine;

/// Per-request handlers share only the engine and the lifecycle manager
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn MediaEngine>,
    pub lifecycle: Arc<FileLifecycleManager>,
}

impl AppState {
    pub fn new(engine: Arc<dyn MediaEngine>, download_dir: PathBuf, retention: Duration) -> Self {
        let lifecycle = FileLifecycleManager::new(download_dir, engine.clone(), retention);
        Self {
            engine,
            lifecycle: Arc::new(lifecycle),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/get_info", post(get_info))
        .route("/download", post(download))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Periodic retention sweep; per-request sweeps still run after each download
pub fn spawn_sweeper(lifecycle: Arc<FileLifecycleManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            lifecycle.sweep().await;
        }
    })
}

pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(?config, "starting");

    tokio::fs::create_dir_all(&config.download_dir).await?;

    let engine: Arc<dyn MediaEngine> = Arc::new(YtDlpEngine::from_config(&config).await);
    let state = AppState::new(engine, config.download_dir.clone(), config.retention);

    if !config.sweep_interval.is_zero() {
        spawn_sweeper(state.lifecycle.clone(), config.sweep_interval);
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
