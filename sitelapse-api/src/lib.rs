//! sitelapse-api library - HTTP surface for the viewer
//!
//! Serves the derived timeline views over HTTP: scene packet layers,
//! delivery dates for the calendar, and progress queries for the HUD.

use axum::Router;
use sitelapse_common::config::ProjectConfig;
use sitelapse_engine::fetch::AssetApiClient;
use sitelapse_engine::progress::ProgressTimeseries;
use sitelapse_engine::store::SnapshotStore;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The served project's configuration
    pub config: Arc<ProjectConfig>,
    /// Upstream asset API client
    pub client: Arc<AssetApiClient>,
    /// Built layer responses, keyed by project/layer/date
    pub layers: Arc<SnapshotStore<serde_json::Value>>,
    /// Lazily-ingested weekly progress series
    pub progress: Arc<RwLock<Option<Arc<ProgressTimeseries>>>>,
}

impl AppState {
    pub fn new(config: ProjectConfig, client: AssetApiClient) -> Self {
        Self {
            config: Arc::new(config),
            client: Arc::new(client),
            layers: Arc::new(SnapshotStore::new()),
            progress: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(api::health_check))
        .route("/api/projects/:id/czml/:layer", get(api::get_layer))
        .route("/api/projects/:id/assets/dates", get(api::get_delivery_dates))
        .route("/api/projects/:id/progress", get(api::query_progress))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
