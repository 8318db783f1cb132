//! Day-granularity time utilities
//!
//! The whole timeline pipeline operates on UTC instants clamped to day
//! boundaries: availability windows open at 00:00:00.000 and close at
//! 23:59:59.999 so that adjacent windows partition the timeline with no
//! gaps and no overlap regardless of the capture timestamps' time of day.
//!
//! All business logic uses `chrono::DateTime<Utc>` directly; conversion to
//! whatever time representation a renderer uses happens at the renderer
//! boundary, never here.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Clamp an instant to the start of its UTC day (00:00:00.000)
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&t.date_naive().and_time(NaiveTime::MIN))
}

/// Clamp an instant to the end of its UTC day (23:59:59.999)
pub fn end_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(t) + Duration::days(1) - Duration::milliseconds(1)
}

/// End of the UTC day immediately before the given instant's day
pub fn end_of_previous_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(t) - Duration::milliseconds(1)
}

/// Midnight UTC instant opening the given calendar day
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Noon UTC of the given calendar day
///
/// Used when snapping a clock to a selected date: noon keeps the instant
/// well inside the day's availability window on both sides.
pub fn noon_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)))
}

/// Calendar day of an instant (UTC)
pub fn day_of(t: DateTime<Utc>) -> NaiveDate {
    t.date_naive()
}

/// Format an instant's calendar day as `YYYY-MM-DD`
pub fn format_day(t: DateTime<Utc>) -> String {
    t.date_naive().format("%Y-%m-%d").to_string()
}

/// Parse an instant from the formats upstream payloads actually use.
///
/// Accepted, in order: RFC 3339 (`2025-05-11T10:30:00Z` and offset
/// variants), bare date (`2025-05-11`, resolved to start of day), and
/// `YYYY-MM-DD HH:MM:SS`. Returns `None` for anything else; callers decide
/// the fallback (usually the project bounds).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }

    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }

    None
}

/// Format an instant as ISO 8601 with millisecond precision and `Z` suffix
pub fn format_instant(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A time interval on the project timeline.
///
/// Half-open `[start, end)` by construction for all but the last window in
/// a windowed sequence, which is closed `[start, end]`; in practice both
/// bounds are day-clamped so `contains` can test inclusively on both ends.
///
/// Serializes as the ISO 8601 interval string `"<start>/<end>"`, which is
/// the wire form timeline renderers consume for entity availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive window start
    pub start: DateTime<Utc>,
    /// Inclusive window end
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window; callers are responsible for `start <= end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether the instant falls inside the window (inclusive both ends)
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// ISO 8601 interval form: `"<start>/<end>"`
    pub fn iso8601(&self) -> String {
        format!("{}/{}", format_instant(self.start), format_instant(self.end))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso8601())
    }
}

impl Serialize for TimeWindow {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.iso8601())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_instant(s).expect("test instant")
    }

    #[test]
    fn test_start_of_day_clamps_to_midnight() {
        let t = at("2025-05-11T17:42:09Z");
        assert_eq!(format_instant(start_of_day(t)), "2025-05-11T00:00:00.000Z");
    }

    #[test]
    fn test_end_of_day_is_last_millisecond() {
        let t = at("2025-05-11T00:00:00Z");
        assert_eq!(format_instant(end_of_day(t)), "2025-05-11T23:59:59.999Z");
    }

    #[test]
    fn test_end_of_previous_day() {
        let t = at("2025-05-11T08:00:00Z");
        assert_eq!(
            format_instant(end_of_previous_day(t)),
            "2025-05-10T23:59:59.999Z"
        );
    }

    #[test]
    fn test_adjacent_days_leave_no_gap() {
        // end of day N + 1ms == start of day N+1
        let t = at("2025-05-11T13:00:00Z");
        let next = at("2025-05-12T01:00:00Z");
        assert_eq!(
            end_of_day(t) + Duration::milliseconds(1),
            start_of_day(next)
        );
    }

    #[test]
    fn test_parse_instant_rfc3339() {
        let t = parse_instant("2025-05-11T10:30:00Z").unwrap();
        assert_eq!(format_day(t), "2025-05-11");
    }

    #[test]
    fn test_parse_instant_bare_date() {
        let t = parse_instant("2025-05-11").unwrap();
        assert_eq!(format_instant(t), "2025-05-11T00:00:00.000Z");
    }

    #[test]
    fn test_parse_instant_space_separated() {
        let t = parse_instant("2025-05-11 10:30:00").unwrap();
        assert_eq!(format_instant(t), "2025-05-11T10:30:00.000Z");
    }

    #[test]
    fn test_parse_instant_garbage_is_none() {
        assert!(parse_instant("").is_none());
        assert!(parse_instant("not-a-date").is_none());
        assert!(parse_instant("2025-13-45").is_none());
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let w = TimeWindow::new(at("2025-05-05"), at("2025-05-11T23:59:59Z"));
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(w.contains(at("2025-05-08T12:00:00Z")));
        assert!(!w.contains(at("2025-05-12")));
    }

    #[test]
    fn test_window_iso8601_form() {
        let w = TimeWindow::new(at("2025-05-05"), at("2025-05-11"));
        assert_eq!(
            w.iso8601(),
            "2025-05-05T00:00:00.000Z/2025-05-11T00:00:00.000Z"
        );
    }

    #[test]
    fn test_window_serializes_as_interval_string() {
        let w = TimeWindow::new(at("2025-05-05"), at("2025-05-11"));
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, "\"2025-05-05T00:00:00.000Z/2025-05-11T00:00:00.000Z\"");
    }

    #[test]
    fn test_day_start() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 11).unwrap();
        assert_eq!(format_instant(day_start(day)), "2025-05-11T00:00:00.000Z");
    }

    #[test]
    fn test_noon_of_day() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 11).unwrap();
        assert_eq!(format_instant(noon_of_day(day)), "2025-05-11T12:00:00.000Z");
    }
}
