//! Delivery dates endpoint
//!
//! `GET /api/projects/:id/assets/dates` returns the sorted unique capture
//! days across all deliveries; the calendar widget enables exactly these.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sitelapse_engine::fetch::UpstreamError;
use sitelapse_engine::window::distinct_days;

#[derive(Debug, Serialize)]
pub struct DeliveryDatesMeta {
    pub count: usize,
    /// Transport error descriptor when the upstream fetch failed; the
    /// date list is then empty rather than missing
    pub external_error: Option<UpstreamError>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryDatesResponse {
    /// `YYYY-MM-DD`, ascending
    pub dates: Vec<String>,
    pub meta: DeliveryDatesMeta,
}

/// GET /api/projects/:id/assets/dates
pub async fn get_delivery_dates(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<DeliveryDatesResponse>, ApiError> {
    if project_id != state.config.project_id {
        return Err(ApiError::UnknownProject(project_id));
    }

    let outcome = state.client.fetch_assets(&state.config).await?;

    let dates: Vec<String> = distinct_days(&outcome.items, |i| i.captured_at)
        .into_iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();

    Ok(Json(DeliveryDatesResponse {
        meta: DeliveryDatesMeta {
            count: dates.len(),
            external_error: outcome.error,
        },
        dates,
    }))
}
