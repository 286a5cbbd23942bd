//! persona-analyzer library interface
//!
//! Exposes the pipeline and the router for integration testing.

pub mod aggregator;
pub mod analyzer;
pub mod api;
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod scoring;
pub mod visualizer;

pub use crate::analyzer::{AnalysisResult, Analyzer};
pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use persona_common::models::DOWNLOADS_ROUTE;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    /// Root of downloaded post images, served under `/downloads`
    pub download_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last server-side error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>, download_dir: PathBuf) -> Self {
        Self {
            analyzer,
            download_dir,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let downloads = ServeDir::new(&state.download_dir);

    Router::new()
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .nest_service(DOWNLOADS_ROUTE, downloads)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
