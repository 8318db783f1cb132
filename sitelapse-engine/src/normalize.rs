//! Delivery payload normalization
//!
//! The upstream asset API has grown several envelope shapes over time; the
//! deliveries array may arrive as a top-level array or nested under
//! `.deliveries`, `.deliveries.entregas`, or `.data.deliveries`. This module
//! probes those shapes in a fixed priority order and flattens each
//! delivery's `assets[].data[]` into individual [`AssetItem`]s.
//!
//! Normalization is a pure transform. A malformed delivery, asset, or item
//! is skipped and never aborts its siblings; an unrecognized asset type is
//! dropped silently.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sitelapse_common::time;

/// The three asset kinds the viewer knows how to place on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Site photo, rendered as a billboard marker
    Photo,
    /// 360° photo, rendered as a billboard marker with a distinct icon
    Photo360,
    /// 3D mesh tileset, referenced by ion asset id
    Tileset,
}

impl AssetKind {
    /// Resolve the declared type string from a payload, accepting the
    /// singular/plural and legacy aliases the API has used
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared {
            "image" | "images" => Some(AssetKind::Photo),
            "image360" | "images360" => Some(AssetKind::Photo360),
            "tileset" | "3dtile" => Some(AssetKind::Tileset),
            _ => None,
        }
    }

    /// Wire name used in layer routes, cache keys, and entity ids
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Photo => "images",
            AssetKind::Photo360 => "images360",
            AssetKind::Tileset => "3dtile",
        }
    }

    /// Parse the wire name back (layer route parameter)
    pub fn from_wire(wire: &str) -> Option<Self> {
        match wire {
            "images" => Some(AssetKind::Photo),
            "images360" => Some(AssetKind::Photo360),
            "3dtile" => Some(AssetKind::Tileset),
            _ => None,
        }
    }
}

/// Reference to an externally-hosted tileset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetRef {
    /// Ion asset id
    pub asset_id: String,
    /// Per-asset access token, when the provider issues one
    pub token: Option<String>,
}

/// One normalized visual asset
///
/// Immutable once produced; everything downstream (windower, packet
/// builder) consumes these read-only.
#[derive(Debug, Clone)]
pub struct AssetItem {
    /// Source item id, or a `{delivery}-{asset}-{item}` ordinal fallback
    pub id: String,
    /// Id of the delivery batch this item arrived in
    pub delivery_id: Option<String>,
    pub kind: AssetKind,
    pub name: Option<String>,
    /// Capture instant; `None` when the payload carried no parseable date
    pub captured_at: Option<DateTime<Utc>>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude: Option<f64>,
    /// Media URL (photo kinds)
    pub media_url: Option<String>,
    /// Tileset reference (tileset kind)
    pub tileset: Option<TilesetRef>,
    pub provider: Option<String>,
}

impl AssetItem {
    /// Whether the item carries a renderable position
    pub fn has_coordinates(&self) -> bool {
        self.longitude.is_some() && self.latitude.is_some()
    }
}

/// Extract the deliveries array from whichever envelope shape the payload
/// uses. Returns an empty slice when no shape matches — absence of data is
/// not an error.
pub fn extract_deliveries(payload: &Value) -> &[Value] {
    if let Some(arr) = payload.as_array() {
        return arr;
    }

    if let Some(arr) = payload.get("deliveries").and_then(Value::as_array) {
        return arr;
    }

    if let Some(arr) = payload
        .pointer("/deliveries/entregas")
        .and_then(Value::as_array)
    {
        return arr;
    }

    if let Some(arr) = payload
        .pointer("/data/deliveries")
        .and_then(Value::as_array)
    {
        return arr;
    }

    &[]
}

/// Flatten a raw payload into normalized asset items.
///
/// Photo items lacking resolvable coordinates are dropped; tilesets are
/// exempt because they position themselves, but a tileset without a
/// resolvable asset id is dropped for the same reason.
pub fn normalize(payload: &Value) -> Vec<AssetItem> {
    let deliveries = extract_deliveries(payload);
    let mut items = Vec::new();

    for (delivery_idx, delivery) in deliveries.iter().enumerate() {
        let Some(assets) = delivery.get("assets").and_then(Value::as_array) else {
            continue;
        };

        let delivery_id = string_at(delivery, &["_id", "id"]);
        let delivery_date = string_at(delivery, &["date", "captured_at"]);

        for (asset_idx, asset) in assets.iter().enumerate() {
            let Some(kind) = asset
                .get("type")
                .and_then(Value::as_str)
                .and_then(AssetKind::from_declared)
            else {
                continue;
            };

            let Some(data) = asset.get("data").and_then(Value::as_array) else {
                continue;
            };

            for (item_idx, raw) in data.iter().enumerate() {
                if let Some(item) = normalize_item(
                    raw,
                    kind,
                    delivery,
                    asset,
                    delivery_id.as_deref(),
                    delivery_date.as_deref(),
                    (delivery_idx, asset_idx, item_idx),
                ) {
                    items.push(item);
                }
            }
        }
    }

    tracing::debug!(count = items.len(), "normalized delivery payload");
    items
}

#[allow(clippy::too_many_arguments)]
fn normalize_item(
    raw: &Value,
    kind: AssetKind,
    delivery: &Value,
    asset: &Value,
    delivery_id: Option<&str>,
    delivery_date: Option<&str>,
    ordinals: (usize, usize, usize),
) -> Option<AssetItem> {
    let metadata = raw.get("metadata").cloned().unwrap_or(Value::Null);

    // Capture date priority: item metadata, then the delivery batch date
    let captured_at = string_at(raw, &["date", "captured_at"])
        .or_else(|| string_at(&metadata, &["captured_at"]))
        .or_else(|| delivery_date.map(str::to_string))
        .and_then(|s| time::parse_instant(&s));

    // Coordinate priority: item metadata, then delivery-level GeoJSON point
    let location = delivery.pointer("/location/coordinates");
    let longitude = number_at(&metadata, &["longitude", "lon"])
        .or_else(|| location.and_then(|c| c.get(0)).and_then(as_f64));
    let latitude = number_at(&metadata, &["latitude", "lat"])
        .or_else(|| location.and_then(|c| c.get(1)).and_then(as_f64));
    let altitude = number_at(&metadata, &["abs_alt", "rel_alt", "alt"]);

    if kind != AssetKind::Tileset && (longitude.is_none() || latitude.is_none()) {
        return None;
    }

    let tileset = match kind {
        AssetKind::Tileset => {
            let asset_id = string_at(raw, &["asset_id"]).or_else(|| {
                string_at(&metadata, &["cesium_asset_id", "asset_id", "ion_asset_id"])
            })?;
            let token = string_at(raw, &["cesium_token"])
                .or_else(|| string_at(&metadata, &["cesium_token", "token"]));
            Some(TilesetRef { asset_id, token })
        }
        _ => None,
    };

    let (delivery_idx, asset_idx, item_idx) = ordinals;
    let id = string_at(raw, &["id"])
        .unwrap_or_else(|| format!("{}-{}-{}", delivery_idx, asset_idx, item_idx));

    let name = string_at(raw, &["name"])
        .or_else(|| string_at(asset, &["name"]))
        .or_else(|| string_at(delivery, &["name"]));

    Some(AssetItem {
        id,
        delivery_id: delivery_id.map(str::to_string),
        kind,
        name,
        captured_at,
        longitude,
        latitude,
        altitude,
        media_url: string_at(raw, &["url"]),
        tileset,
        provider: string_at(raw, &["provider"]).or_else(|| string_at(&metadata, &["provider"])),
    })
}

/// First non-empty string found under the given keys
fn string_at(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First numeric value found under the given keys; numeric strings are
/// accepted because some providers serialize coordinates as text
fn number_at(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(v) = value.get(key).and_then(as_f64) {
            return Some(v);
        }
    }
    None
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
