//! Scene packet construction
//!
//! Turns windowed asset items into the declarative, time-tagged packets a
//! timeline-driven renderer consumes. Every layer response starts with a
//! single document packet carrying the global time interval; entity packets
//! follow, one per visual asset, each tagged with its availability window.
//!
//! Each asset kind is windowed independently: photos, 360° photos, and
//! tilesets are parallel layers, each with its own chronological partition
//! of the timeline.
//!
//! The tileset layer additionally has a plain-metadata form
//! ([`build_tileset_entries`]) for consumers that load tilesets natively
//! and only need `{asset_id, availability}` pairs, without a document
//! packet.

use crate::normalize::{AssetItem, AssetKind};
use crate::window::assign_windows;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sitelapse_common::time::format_instant;
use sitelapse_common::TimeWindow;
use std::collections::HashSet;

const PHOTO_BILLBOARD_SVG: &str = "data:image/svg+xml,%3csvg xmlns='http://www.w3.org/2000/svg' width='26' height='26' viewBox='0 0 26 26' fill='none'%3e%3cg stroke='white' stroke-width='2' stroke-linecap='round' stroke-linejoin='round'%3e%3cpath d='M22 21H4a2 2 0 0 1-2-2V9a2 2 0 0 1 2-2h3.4l1.4-2h8.4l1.4 2H22a2 2 0 0 1 2 2v10a2 2 0 0 1-2 2Z'/%3e%3ccircle cx='13' cy='14' r='4'/%3e%3c/g%3e%3c/svg%3e";

const PHOTO_360_BILLBOARD_SVG: &str = "data:image/svg+xml,%3csvg xmlns='http://www.w3.org/2000/svg' width='28' height='28' viewBox='0 0 28 28' fill='none'%3e%3cg stroke='white' stroke-width='2' stroke-linecap='round' stroke-linejoin='round'%3e%3ccircle cx='14' cy='14' r='4'/%3e%3cpath d='M5 9.5c2.2-2.3 5.4-3.5 9-3.5s6.8 1.2 9 3.5'/%3e%3cpath d='M23 18.5c-2.2 2.3-5.4 3.5-9 3.5s-6.8-1.2-9-3.5'/%3e%3cpath d='M6.5 11.5L4 9'/%3e%3cpath d='M6.5 16.5 4 19'/%3e%3cpath d='M21.5 11.5 24 9'/%3e%3cpath d='M21.5 16.5 24 19'/%3e%3cpath d='M10.5 14h7'/%3e%3c/g%3e%3c/svg%3e";

/// Clock definition on the document packet of an animated layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSpec {
    /// Global time interval, `"<start>/<end>"`
    pub interval: String,
    pub current_time: String,
    /// Seconds of scene time per second of wall time
    pub multiplier: i64,
    pub range: &'static str,
}

impl ClockSpec {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, multiplier: i64) -> Self {
        Self {
            interval: TimeWindow::new(start, end).iso8601(),
            current_time: format_instant(start),
            multiplier,
            range: "LOOP_STOP",
        }
    }
}

/// The singleton document packet opening every packet layer
#[derive(Debug, Serialize)]
pub struct DocumentPacket {
    pub id: &'static str,
    pub name: String,
    pub version: &'static str,
    /// Present only for layers played back as an animated clock; sparse
    /// layers (photos are binary present/absent) carry no clock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockSpec>,
}

impl DocumentPacket {
    pub fn new(name: impl Into<String>, clock: Option<ClockSpec>) -> Self {
        Self {
            id: "document",
            name: name.into(),
            version: "1.0",
            clock,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSpec {
    /// `[longitude, latitude, height]` in degrees / meters
    pub cartographic_degrees: [f64; 3],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillboardSpec {
    pub image: &'static str,
    pub scale: f64,
    pub vertical_origin: &'static str,
    pub show: bool,
}

impl BillboardSpec {
    fn for_kind(kind: AssetKind) -> Self {
        let is_360 = kind == AssetKind::Photo360;
        Self {
            image: if is_360 {
                PHOTO_360_BILLBOARD_SVG
            } else {
                PHOTO_BILLBOARD_SVG
            },
            scale: if is_360 { 0.8 } else { 0.65 },
            vertical_origin: "BOTTOM",
            show: true,
        }
    }
}

/// Reference-by-URI visual for the animated tileset layer
#[derive(Debug, Serialize)]
pub struct TilesetSpec {
    pub uri: String,
    pub show: bool,
}

/// One time-tagged visual entity
#[derive(Debug, Serialize)]
pub struct EntityPacket {
    pub id: String,
    pub name: String,
    pub availability: TimeWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billboard: Option<BillboardSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tileset: Option<TilesetSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A packet in a layer response: the document first, entities after
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScenePacket {
    Document(DocumentPacket),
    Entity(Box<EntityPacket>),
}

/// Tileset metadata entry for native tileset loading.
///
/// This layer is returned as a bare array (no document packet): visibility
/// is driven by the consumer's own availability check, not by a packet
/// stream.
#[derive(Debug, Serialize)]
pub struct TilesetEntry {
    pub asset_id: String,
    pub name: String,
    pub availability: TimeWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cesium_token: Option<String>,
}

/// Allocates build-unique entity ids.
///
/// Upstream item ids are not guaranteed unique across deliveries, and the
/// renderer silently merges entities with duplicate ids, so collisions get
/// an incrementing numeric suffix.
#[derive(Debug, Default)]
struct IdAllocator {
    seen: HashSet<String>,
}

impl IdAllocator {
    fn allocate(&mut self, candidate: String) -> String {
        if self.seen.insert(candidate.clone()) {
            return candidate;
        }
        let mut counter = 1u32;
        loop {
            let unique = format!("{}_{}", candidate, counter);
            if self.seen.insert(unique.clone()) {
                return unique;
            }
            counter += 1;
        }
    }
}

fn media_description(url: &str) -> String {
    format!(
        "<img src='{}' style='max-width:100%;max-height:400px;display:block;margin:auto;'>",
        url
    )
}

/// Build the packet layer for a photo kind (`Photo` or `Photo360`).
///
/// Items of other kinds (and items without coordinates) are ignored; with
/// zero qualifying entities the result is the document packet alone.
pub fn build_billboard_layer(
    project_id: &str,
    kind: AssetKind,
    items: &[AssetItem],
    project_start: DateTime<Utc>,
    project_end: DateTime<Utc>,
) -> Vec<ScenePacket> {
    let document = DocumentPacket::new("CZML Images", None);

    let qualifying: Vec<&AssetItem> = items
        .iter()
        .filter(|i| i.kind == kind && i.has_coordinates())
        .collect();

    let windowed = assign_windows(
        qualifying,
        |item| item.captured_at,
        project_start,
        project_end,
    );

    let mut ids = IdAllocator::default();
    let name_prefix = if kind == AssetKind::Photo360 {
        "Foto360"
    } else {
        "Foto"
    };

    let mut packets = vec![ScenePacket::Document(document)];

    for (ordinal, windowed_item) in windowed.iter().enumerate() {
        let item = windowed_item.item;
        let (Some(lon), Some(lat)) = (item.longitude, item.latitude) else {
            continue;
        };

        let id = ids.allocate(format!("{}_{}_{}", project_id, kind.as_str(), item.id));
        let name = item
            .name
            .clone()
            .unwrap_or_else(|| format!("{} {}", name_prefix, ordinal));

        packets.push(ScenePacket::Entity(Box::new(EntityPacket {
            id,
            name,
            availability: windowed_item.window,
            position: Some(PositionSpec {
                cartographic_degrees: [lon, lat, item.altitude.unwrap_or(0.0)],
            }),
            billboard: Some(BillboardSpec::for_kind(kind)),
            tileset: None,
            description: item.media_url.as_deref().map(media_description),
        })));
    }

    packets
}

/// Build the native-loading tileset metadata array.
///
/// Tileset items without a resolvable asset reference are skipped.
pub fn build_tileset_entries(
    items: &[AssetItem],
    project_start: DateTime<Utc>,
    project_end: DateTime<Utc>,
) -> Vec<TilesetEntry> {
    let qualifying: Vec<&AssetItem> = items
        .iter()
        .filter(|i| i.kind == AssetKind::Tileset && i.tileset.is_some())
        .collect();

    let windowed = assign_windows(
        qualifying,
        |item| item.captured_at,
        project_start,
        project_end,
    );

    windowed
        .into_iter()
        .filter_map(|w| {
            let tileset = w.item.tileset.as_ref()?;
            Some(TilesetEntry {
                asset_id: tileset.asset_id.clone(),
                name: w
                    .item
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Tileset {}", tileset.asset_id)),
                availability: w.window,
                cesium_token: tileset.token.clone(),
            })
        })
        .collect()
}

/// Build the packet form of the tileset layer.
///
/// This is the animated-clock variant: the document packet carries the
/// project interval and the playback multiplier, and each tileset is a
/// reference-by-URI entity. Consumers that load tilesets natively use
/// [`build_tileset_entries`] instead.
pub fn build_tileset_packets(
    items: &[AssetItem],
    project_start: DateTime<Utc>,
    project_end: DateTime<Utc>,
    multiplier: i64,
) -> Vec<ScenePacket> {
    let document = DocumentPacket::new(
        "CZML 3D Tiles",
        Some(ClockSpec::new(project_start, project_end, multiplier)),
    );

    let qualifying: Vec<&AssetItem> = items
        .iter()
        .filter(|i| i.kind == AssetKind::Tileset && i.media_url.is_some())
        .collect();

    if qualifying.is_empty() {
        return vec![ScenePacket::Document(document)];
    }

    let windowed = assign_windows(
        qualifying,
        |item| item.captured_at,
        project_start,
        project_end,
    );

    let mut packets = vec![ScenePacket::Document(document)];

    for (ordinal, w) in windowed.iter().enumerate() {
        let item = w.item;
        let Some(uri) = item.media_url.clone() else {
            continue;
        };

        packets.push(ScenePacket::Entity(Box::new(EntityPacket {
            id: format!("3dtile-{}", item.id),
            name: item
                .name
                .clone()
                .unwrap_or_else(|| format!("3D Tiles {}", ordinal + 1)),
            availability: w.window,
            position: None,
            billboard: None,
            tileset: Some(TilesetSpec { uri, show: true }),
            description: None,
        })));
    }

    packets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::TilesetRef;
    use chrono::DateTime;
    use sitelapse_common::time::parse_instant;

    fn at(s: &str) -> DateTime<Utc> {
        parse_instant(s).expect("test instant")
    }

    fn photo(id: &str, captured: Option<&str>) -> AssetItem {
        AssetItem {
            id: id.to_string(),
            delivery_id: Some("d1".to_string()),
            kind: AssetKind::Photo,
            name: None,
            captured_at: captured.and_then(parse_instant),
            longitude: Some(-68.1),
            latitude: Some(-38.9),
            altitude: Some(300.0),
            media_url: Some(format!("https://cdn.example.com/{}.jpg", id)),
            tileset: None,
            provider: None,
        }
    }

    fn tileset(id: &str, asset_id: &str, captured: Option<&str>) -> AssetItem {
        AssetItem {
            id: id.to_string(),
            delivery_id: None,
            kind: AssetKind::Tileset,
            name: None,
            captured_at: captured.and_then(parse_instant),
            longitude: None,
            latitude: None,
            altitude: None,
            media_url: None,
            tileset: Some(TilesetRef {
                asset_id: asset_id.to_string(),
                token: Some("tok".to_string()),
            }),
            provider: None,
        }
    }

    fn bounds() -> (DateTime<Utc>, DateTime<Utc>) {
        (at("2025-03-01"), at("2025-12-31"))
    }

    #[test]
    fn test_document_packet_comes_first() {
        let (start, end) = bounds();
        let items = vec![photo("a", Some("2025-05-05"))];
        let packets = build_billboard_layer("proj", AssetKind::Photo, &items, start, end);

        assert_eq!(packets.len(), 2);
        let json = serde_json::to_value(&packets).unwrap();
        assert_eq!(json[0]["id"], "document");
        assert_eq!(json[0]["version"], "1.0");
        // Sparse layer: no clock on the document
        assert!(json[0].get("clock").is_none());
    }

    #[test]
    fn test_empty_layer_is_document_only() {
        let (start, end) = bounds();
        let packets = build_billboard_layer("proj", AssetKind::Photo, &[], start, end);
        assert_eq!(packets.len(), 1);
        assert!(matches!(packets[0], ScenePacket::Document(_)));
    }

    #[test]
    fn test_entity_shape_on_the_wire() {
        let (start, end) = bounds();
        let items = vec![photo("a", Some("2025-05-05"))];
        let packets = build_billboard_layer("proj", AssetKind::Photo, &items, start, end);
        let json = serde_json::to_value(&packets).unwrap();

        let entity = &json[1];
        assert_eq!(entity["id"], "proj_images_a");
        assert_eq!(
            entity["position"]["cartographicDegrees"],
            serde_json::json!([-68.1, -38.9, 300.0])
        );
        assert_eq!(entity["billboard"]["verticalOrigin"], "BOTTOM");
        assert_eq!(entity["billboard"]["scale"], 0.65);
        assert!(entity["availability"]
            .as_str()
            .unwrap()
            .starts_with("2025-05-05T00:00:00.000Z/"));
        assert!(entity["description"]
            .as_str()
            .unwrap()
            .contains("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn test_photo360_gets_distinct_icon_and_scale() {
        let (start, end) = bounds();
        let mut item = photo("p", Some("2025-05-05"));
        item.kind = AssetKind::Photo360;
        let packets = build_billboard_layer("proj", AssetKind::Photo360, &[item], start, end);
        let json = serde_json::to_value(&packets).unwrap();

        assert_eq!(json[1]["billboard"]["scale"], 0.8);
        assert_ne!(
            json[1]["billboard"]["image"],
            serde_json::json!(PHOTO_BILLBOARD_SVG)
        );
    }

    #[test]
    fn test_colliding_ids_get_numeric_suffixes() {
        let (start, end) = bounds();
        let items = vec![
            photo("dup", Some("2025-05-05")),
            photo("dup", Some("2025-06-01")),
            photo("dup", Some("2025-07-01")),
        ];
        let packets = build_billboard_layer("proj", AssetKind::Photo, &items, start, end);
        let json = serde_json::to_value(&packets).unwrap();

        assert_eq!(json[1]["id"], "proj_images_dup");
        assert_eq!(json[2]["id"], "proj_images_dup_1");
        assert_eq!(json[3]["id"], "proj_images_dup_2");
    }

    #[test]
    fn test_kinds_are_windowed_independently() {
        let (start, end) = bounds();
        // A 360 photo captured between the two plain photos must not
        // shorten the first photo's window.
        let mut pano = photo("pano", Some("2025-05-20"));
        pano.kind = AssetKind::Photo360;
        let items = vec![
            photo("a", Some("2025-05-05")),
            pano,
            photo("b", Some("2025-06-01")),
        ];

        let packets = build_billboard_layer("proj", AssetKind::Photo, &items, start, end);
        let json = serde_json::to_value(&packets).unwrap();

        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(
            json[1]["availability"],
            "2025-05-05T00:00:00.000Z/2025-05-31T23:59:59.999Z"
        );
    }

    #[test]
    fn test_tileset_entries_bare_array() {
        let (start, end) = bounds();
        let items = vec![
            tileset("t1", "111", Some("2025-05-05")),
            tileset("t2", "222", Some("2025-06-01")),
        ];
        let entries = build_tileset_entries(&items, start, end);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].asset_id, "111");
        assert_eq!(
            entries[0].availability.iso8601(),
            "2025-05-05T00:00:00.000Z/2025-05-31T23:59:59.999Z"
        );
        assert_eq!(
            entries[1].availability.iso8601(),
            "2025-06-01T00:00:00.000Z/2025-12-31T23:59:59.999Z"
        );

        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[0]["cesium_token"], "tok");
        assert_eq!(json[0]["name"], "Tileset 111");
    }

    #[test]
    fn test_tileset_without_ref_skipped() {
        let (start, end) = bounds();
        let mut broken = tileset("t1", "111", Some("2025-05-05"));
        broken.tileset = None;
        let entries = build_tileset_entries(&[broken], start, end);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_tileset_packets_document_carries_clock() {
        let (start, end) = bounds();
        let mut item = tileset("t1", "111", Some("2025-05-05"));
        item.media_url = Some("https://tiles.example.com/t1/tileset.json".to_string());

        let packets = build_tileset_packets(&[item], start, end, 86_400);
        let json = serde_json::to_value(&packets).unwrap();

        assert_eq!(json[0]["id"], "document");
        assert_eq!(json[0]["clock"]["multiplier"], 86_400);
        assert_eq!(json[0]["clock"]["range"], "LOOP_STOP");
        assert_eq!(json[1]["id"], "3dtile-t1");
        assert_eq!(
            json[1]["tileset"]["uri"],
            "https://tiles.example.com/t1/tileset.json"
        );
    }

    #[test]
    fn test_tileset_packets_empty_is_document_only() {
        let (start, end) = bounds();
        let packets = build_tileset_packets(&[], start, end, 86_400);
        assert_eq!(packets.len(), 1);
        let json = serde_json::to_value(&packets).unwrap();
        assert!(json[0].get("clock").is_some());
    }
}
