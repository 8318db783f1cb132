//! Progress query endpoint
//!
//! `GET /api/projects/:id/progress?at=<instant>` resolves the HUD figures
//! for one timeline instant. The weekly table is fetched and ingested on
//! first use and cached for the process lifetime; a failed table fetch
//! degrades to the all-zero neutral result and is retried on the next
//! request.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sitelapse_common::time::parse_instant;
use sitelapse_engine::progress::{ProgressQueryResult, ProgressTimeseries};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    /// Query instant (RFC 3339 or `YYYY-MM-DD`)
    pub at: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub result: ProgressQueryResult,
    /// Largest planned percentage, the HUD's 100% bar width
    pub max_accumulated_percentage: f64,
}

/// GET /api/projects/:id/progress?at=...
pub async fn query_progress(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, ApiError> {
    if project_id != state.config.project_id {
        return Err(ApiError::UnknownProject(project_id));
    }

    let Some(instant) = parse_instant(&query.at) else {
        return Err(ApiError::BadRequest(format!(
            "invalid instant: {}",
            query.at
        )));
    };

    let series = load_series(&state).await?;
    let result = series.query_at(instant);

    Ok(Json(ProgressResponse {
        result,
        max_accumulated_percentage: series.max_accumulated_percentage(),
    }))
}

/// Ingested series from cache, or fetch-and-ingest on first use
async fn load_series(state: &AppState) -> Result<Arc<ProgressTimeseries>, ApiError> {
    if let Some(series) = state.progress.read().await.as_ref() {
        return Ok(Arc::clone(series));
    }

    let Some(plan) = &state.config.weekly_plan else {
        return Err(ApiError::NoProgressPlan);
    };
    let Some(url) = &plan.url else {
        return Err(ApiError::Config(
            "weekly_plan.url is not configured".to_string(),
        ));
    };

    let outcome = state.client.fetch_progress_table(url).await;
    let Some(table) = outcome.table else {
        let message = outcome
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "empty response".to_string());
        tracing::warn!("progress table fetch failed: {}", message);
        // Neutral state: zero bars, retry on the next request
        return Ok(Arc::new(ProgressTimeseries::default()));
    };

    let series = Arc::new(ProgressTimeseries::ingest(&table, plan));
    tracing::info!(
        weeks = series.samples().len(),
        "ingested weekly progress table"
    );
    *state.progress.write().await = Some(Arc::clone(&series));
    Ok(series)
}
