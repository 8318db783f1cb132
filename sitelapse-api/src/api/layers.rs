//! Scene layer endpoint
//!
//! `GET /api/projects/:id/czml/:layer` serves the packet form for the
//! photo layers and the bare metadata array for the tileset layer. An
//! optional `?date=YYYY-MM-DD` restricts the response to entities whose
//! availability window covers that day (the scene "as of" the date).
//!
//! Successful responses are cached per `{project}:{layer}[:{date}]`;
//! upstream-degraded responses are served but never cached, so the next
//! request retries the fetch.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use sitelapse_common::time::noon_of_day;
use sitelapse_engine::normalize::AssetKind;
use sitelapse_engine::scene::{self, ScenePacket};
use sitelapse_engine::store::LayerKey;

/// Query parameters for the layer endpoint
#[derive(Debug, Deserialize)]
pub struct LayerQuery {
    /// Restrict to entities active on this day (`YYYY-MM-DD`)
    pub date: Option<String>,
}

/// GET /api/projects/:id/czml/:layer[?date=YYYY-MM-DD]
pub async fn get_layer(
    State(state): State<AppState>,
    Path((project_id, layer)): Path<(String, String)>,
    Query(query): Query<LayerQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if project_id != state.config.project_id {
        return Err(ApiError::UnknownProject(project_id));
    }

    let Some(kind) = AssetKind::from_wire(&layer) else {
        return Err(ApiError::UnknownLayer(layer));
    };

    let date = match &query.date {
        None => None,
        Some(raw) => Some(
            raw.parse::<NaiveDate>()
                .map_err(|_| ApiError::BadRequest(format!("invalid date: {}", raw)))?,
        ),
    };

    let key = LayerKey::new(project_id.clone(), kind, date);
    if let Some(cached) = state.layers.lookup(&key).await {
        tracing::debug!(layer = kind.as_str(), "layer cache hit");
        return Ok(Json((*cached).clone()));
    }

    let token = state.layers.begin_request(&key).await;
    let outcome = state.client.fetch_assets(&state.config).await?;

    let start = state.config.start_date;
    let end = state.config.end_date;

    let value = match kind {
        AssetKind::Tileset => {
            let mut entries = scene::build_tileset_entries(&outcome.items, start, end);
            if let Some(day) = date {
                let at = noon_of_day(day);
                entries.retain(|e| e.availability.contains(at));
            }
            serde_json::to_value(&entries)
                .map_err(|e| ApiError::Internal(e.to_string()))?
        }
        photo_kind => {
            let mut packets = scene::build_billboard_layer(
                &state.config.project_id,
                photo_kind,
                &outcome.items,
                start,
                end,
            );
            if let Some(day) = date {
                let at = noon_of_day(day);
                packets.retain(|p| match p {
                    ScenePacket::Document(_) => true,
                    ScenePacket::Entity(e) => e.availability.contains(at),
                });
            }
            serde_json::to_value(&packets)
                .map_err(|e| ApiError::Internal(e.to_string()))?
        }
    };

    // A degraded fetch produced an empty-but-valid layer; serve it but let
    // the next request retry instead of pinning the empty scene
    if outcome.error.is_none() {
        state.layers.install(&token, value.clone()).await;
    } else {
        tracing::warn!(
            layer = kind.as_str(),
            "serving degraded layer response without caching"
        );
    }

    Ok(Json(value))
}
