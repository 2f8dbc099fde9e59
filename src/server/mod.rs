//! Local web server: a drag-and-drop page plus a small JSON API.
//!
//! | Method | Path                  | Purpose                                   |
//! |--------|-----------------------|-------------------------------------------|
//! | GET    | `/`                   | drag-and-drop page                        |
//! | GET    | `/health`             | liveness                                  |
//! | GET    | `/api/config`         | allowed extensions and size limits        |
//! | POST   | `/api/file-info`      | per-file display metadata, no conversion  |
//! | POST   | `/api/convert`        | convert a batch, answer with the download |
//! | GET    | `/api/history/stats`  | aggregate history statistics              |
//!
//! Batches run one at a time; a second request waits for the first.

pub mod error;
pub mod handlers;

use crate::batch::BatchOrchestrator;
use crate::pipeline::scratch::clean_stale;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, ErrorBody};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BatchOrchestrator>,
    /// Held for the duration of one batch.
    lane: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(orchestrator: BatchOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            lane: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the router with all routes, the request body limit and request tracing.
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.orchestrator.config().max_request_bytes)
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/api/config", get(handlers::get_config))
        .route("/api/file-info", post(handlers::file_info))
        .route("/api/convert", post(handlers::convert))
        .route("/api/history/stats", get(handlers::history_stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Sweep stale temp files, bind `bind_addr` and serve until Ctrl-C.
pub async fn start_server(orchestrator: BatchOrchestrator) -> std::io::Result<()> {
    let config = orchestrator.config().clone();

    let (temp_dir, max_age) = (config.temp_dir.clone(), config.stale_temp_age());
    match tokio::task::spawn_blocking(move || clean_stale(&temp_dir, max_age)).await {
        Ok(Ok(0)) => {}
        Ok(Ok(n)) => info!("Swept {} stale temp file(s) at startup", n),
        Ok(Err(e)) => warn!("{}", e),
        Err(e) => warn!("Stale temp sweep did not finish: {}", e),
    }

    let app = build_router(AppState::new(orchestrator));
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("drop2md listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
