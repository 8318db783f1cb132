//! End-to-end pipeline tests
//!
//! Exercises the full derivation chain the viewer depends on: raw payload
//! → normalizer → windower → packet builder, plus the calendar binding
//! over the same delivery dates.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sitelapse_engine::calendar::{CalendarTimelineSync, CalendarWidget};
use sitelapse_engine::normalize::{self, AssetKind};
use sitelapse_engine::scene;
use sitelapse_engine::window::{assign_windows, distinct_days};
use sitelapse_common::time::parse_instant;

fn at(s: &str) -> DateTime<Utc> {
    parse_instant(s).expect("test instant")
}

fn project_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    (at("2025-03-01"), at("2025-12-31"))
}

/// A payload shaped like a real upstream response: three deliveries over
/// three months, mixed asset kinds, one photo with delivery-level
/// coordinates only, one delivery with a junk date.
fn realistic_payload() -> serde_json::Value {
    json!({
        "deliveries": [
            {
                "_id": "d-mar",
                "date": "2025-03-15T11:00:00Z",
                "location": { "type": "Point", "coordinates": [-68.10, -38.90] },
                "assets": [
                    {
                        "type": "images",
                        "data": [
                            { "id": "p1", "url": "https://cdn/p1.jpg",
                              "metadata": { "longitude": -68.11, "latitude": -38.91 } },
                            { "id": "p2", "url": "https://cdn/p2.jpg" }
                        ]
                    },
                    {
                        "type": "3dtile",
                        "data": [ { "id": "t1", "asset_id": 900100, "cesium_token": "tk1" } ]
                    }
                ]
            },
            {
                "_id": "d-may",
                "date": "2025-05-02T09:30:00Z",
                "assets": [
                    {
                        "type": "images360",
                        "data": [
                            { "id": "pano1", "url": "https://cdn/pano1.jpg",
                              "metadata": { "lon": -68.09, "lat": -38.88, "rel_alt": 80 } }
                        ]
                    },
                    {
                        "type": "3dtile",
                        "data": [ { "id": "t2", "asset_id": 900200 } ]
                    }
                ]
            },
            {
                "_id": "d-bad",
                "date": "not a date",
                "assets": [
                    {
                        "type": "images",
                        "data": [
                            { "id": "p3", "url": "https://cdn/p3.jpg",
                              "metadata": { "longitude": -68.12, "latitude": -38.93 } }
                        ]
                    }
                ]
            }
        ]
    })
}

#[test]
fn normalizes_realistic_payload() {
    let items = normalize::normalize(&realistic_payload());

    // p1, p2 (delivery coords), t1, pano1, t2, p3
    assert_eq!(items.len(), 6);
    assert_eq!(
        items.iter().filter(|i| i.kind == AssetKind::Photo).count(),
        3
    );
    assert_eq!(
        items.iter().filter(|i| i.kind == AssetKind::Tileset).count(),
        2
    );

    // The junk-dated delivery's item survives, undated
    let p3 = items.iter().find(|i| i.id == "p3").unwrap();
    assert!(p3.captured_at.is_none());
}

#[test]
fn windows_partition_the_project_timeline() {
    let (start, end) = project_bounds();
    let items = normalize::normalize(&realistic_payload());

    let photos: Vec<_> = items
        .iter()
        .filter(|i| i.kind == AssetKind::Photo)
        .collect();
    let windowed = assign_windows(photos, |i| i.captured_at, start, end);

    // Sorted, gap-free, clamped to project bounds
    for pair in windowed.windows(2) {
        assert!(pair[0].window.start <= pair[1].window.start);
        assert_eq!(
            pair[0].window.end + Duration::milliseconds(1),
            pair[1].window.start
        );
    }
    assert_eq!(
        windowed.last().unwrap().window.end,
        sitelapse_common::time::end_of_day(end)
    );
    // The undated photo sorts to the project start
    assert_eq!(
        windowed[0].window.start,
        sitelapse_common::time::start_of_day(start)
    );
}

#[test]
fn photo_layer_document_first_then_windowed_entities() {
    let (start, end) = project_bounds();
    let items = normalize::normalize(&realistic_payload());

    let packets = scene::build_billboard_layer("demo", AssetKind::Photo, &items, start, end);
    let json = serde_json::to_value(&packets).unwrap();
    let array = json.as_array().unwrap();

    assert_eq!(array[0]["id"], "document");
    assert_eq!(array.len(), 4); // document + three photos

    // Every entity id is unique
    let mut ids: Vec<&str> = array[1..]
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);

    // Availability strings parse back into ordered interval pairs
    for packet in &array[1..] {
        let availability = packet["availability"].as_str().unwrap();
        let (from, to) = availability.split_once('/').unwrap();
        assert!(parse_instant(from).unwrap() < parse_instant(to).unwrap());
    }
}

#[test]
fn tileset_layer_is_bare_entry_array() {
    let (start, end) = project_bounds();
    let items = normalize::normalize(&realistic_payload());

    let entries = scene::build_tileset_entries(&items, start, end);
    assert_eq!(entries.len(), 2);

    // March tileset runs until the day before the May capture
    assert_eq!(
        entries[0].availability.iso8601(),
        "2025-03-15T00:00:00.000Z/2025-05-01T23:59:59.999Z"
    );
    assert_eq!(
        entries[1].availability.iso8601(),
        "2025-05-02T00:00:00.000Z/2025-12-31T23:59:59.999Z"
    );

    let json = serde_json::to_value(&entries).unwrap();
    assert_eq!(json[0]["asset_id"], "900100");
    assert_eq!(json[0]["cesium_token"], "tk1");
    // No token resolved for the second tileset: field omitted entirely
    assert!(json[1].get("cesium_token").is_none());
}

#[test]
fn empty_payload_degrades_to_document_only() {
    let (start, end) = project_bounds();
    let items = normalize::normalize(&json!({}));
    assert!(items.is_empty());

    let packets = scene::build_billboard_layer("demo", AssetKind::Photo, &items, start, end);
    assert_eq!(serde_json::to_value(&packets).unwrap().as_array().unwrap().len(), 1);

    let entries = scene::build_tileset_entries(&items, start, end);
    assert!(entries.is_empty());
}

#[derive(Default)]
struct RecordingWidget {
    enabled: Vec<chrono::NaiveDate>,
    selection: Option<chrono::NaiveDate>,
}

impl CalendarWidget for RecordingWidget {
    fn set_enabled_dates(&mut self, dates: &[chrono::NaiveDate]) {
        self.enabled = dates.to_vec();
    }
    fn selection(&self) -> Option<chrono::NaiveDate> {
        self.selection
    }
    fn set_selection(&mut self, date: chrono::NaiveDate, _suppress_callback: bool) {
        self.selection = Some(date);
    }
}

#[test]
fn calendar_binding_follows_delivery_dates() {
    let items = normalize::normalize(&realistic_payload());
    let days = distinct_days(&items, |i| i.captured_at);
    // Junk-dated delivery contributes no day
    assert_eq!(days.len(), 2);

    let mut sync = CalendarTimelineSync::new(days);
    let mut widget = RecordingWidget::default();
    sync.bind_widget(&mut widget);
    assert_eq!(widget.enabled.len(), 2);

    // A tick near the May capture snaps the picker to it
    let snapped = sync.on_clock_tick(at("2025-05-04T06:00:00Z"), &mut widget);
    assert_eq!(snapped, widget.selection);
    assert_eq!(
        widget.selection.unwrap().to_string(),
        "2025-05-02"
    );

    // A tick in the dead middle of the project is out of tolerance
    let before = widget.selection;
    assert!(sync.on_clock_tick(at("2025-08-15"), &mut widget).is_none());
    assert_eq!(widget.selection, before);
}
