//! Availability windowing
//!
//! Assigns each dated event a time window such that the windows of a
//! sequence partition the whole project duration: sorted, non-overlapping,
//! and gap-free. An event is "current" from the start of its capture day
//! until the last millisecond before the next event's capture day; the
//! last event stays current through the end of the project.
//!
//! All boundaries are day-clamped in UTC (see `sitelapse_common::time`) so
//! capture timestamps at different times of day cannot produce flapping at
//! timezone boundaries.

use chrono::{DateTime, Utc};
use sitelapse_common::time::{end_of_day, end_of_previous_day, start_of_day};
use sitelapse_common::TimeWindow;

/// An event paired with its assigned availability window
#[derive(Debug, Clone)]
pub struct Windowed<T> {
    pub item: T,
    pub window: TimeWindow,
}

/// Assign availability windows to a list of events.
///
/// `date_of` extracts the capture instant; events with no (parseable) date
/// inherit the project start as their window start rather than aborting the
/// sequence. Events are stable-sorted by capture day ascending, ties keep
/// input order.
///
/// Boundary rules:
/// - `start[i]` = start of the capture day, clamped into the project bounds
/// - `end[i]` = last millisecond of the day before `start[i+1]`; if that
///   would precede `start[i]` (two events on the same day), it clamps to
///   the end of the event's own day instead
/// - `end[last]` = end of the project's final day
///
/// An empty input yields an empty output; callers fall back to a
/// document-only packet.
pub fn assign_windows<T, F>(
    items: Vec<T>,
    date_of: F,
    project_start: DateTime<Utc>,
    project_end: DateTime<Utc>,
) -> Vec<Windowed<T>>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    if items.is_empty() {
        return Vec::new();
    }

    let floor = start_of_day(project_start);
    let ceiling = end_of_day(project_end);

    let mut dated: Vec<(DateTime<Utc>, T)> = items
        .into_iter()
        .map(|item| {
            let start = match date_of(&item) {
                Some(t) => start_of_day(t).clamp(floor, ceiling),
                None => floor,
            };
            (start, item)
        })
        .collect();

    // Stable: ties keep original input order
    dated.sort_by_key(|(start, _)| *start);

    let starts: Vec<DateTime<Utc>> = dated.iter().map(|(s, _)| *s).collect();

    dated
        .into_iter()
        .enumerate()
        .map(|(i, (start, item))| {
            let end = match starts.get(i + 1) {
                Some(next_start) => {
                    let end = end_of_previous_day(*next_start);
                    if end < start {
                        end_of_day(start)
                    } else {
                        end
                    }
                }
                None => ceiling,
            };

            Windowed {
                item,
                window: TimeWindow::new(start, end),
            }
        })
        .collect()
}

/// Distinct capture days of a set of events, ascending.
///
/// This is the date list the calendar binding marks as enabled.
pub fn distinct_days<T, F>(items: &[T], date_of: F) -> Vec<chrono::NaiveDate>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let mut days: Vec<chrono::NaiveDate> = items
        .iter()
        .filter_map(|item| date_of(item).map(|t| t.date_naive()))
        .collect();
    days.sort();
    days.dedup();
    days
}
