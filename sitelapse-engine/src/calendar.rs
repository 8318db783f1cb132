//! Calendar / timeline synchronization
//!
//! Two-way binding between the date picker and the renderer clock:
//! selecting a date snaps the clock to it; clock ticks snap the picker to
//! the nearest known delivery date, but only within a tolerance and only
//! through a suppressed update so the picker's selection callback cannot
//! re-trigger the clock write and loop.
//!
//! The suppression window is modeled as an explicit two-state machine
//! (`Idle` → `Snapping` → `Idle`): while a snap is being applied, incoming
//! `select_date` calls are dropped. The binding lives for one viewer
//! session and is dropped with it.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sitelapse_common::time::{day_start, noon_of_day};

/// Maximum distance at which a clock position still snaps the picker
const SNAP_TOLERANCE_DAYS: i64 = 3;

/// Minimum picker/clock divergence (in days) before a snap is applied
const SNAP_HYSTERESIS_DAYS: i64 = 1;

/// Renderer clock port.
///
/// Implementations adapt whatever time type the renderer uses at this
/// boundary; the synchronizer itself only ever sees UTC instants.
pub trait RendererClock {
    fn current_time(&self) -> DateTime<Utc>;
    fn set_current_time(&mut self, t: DateTime<Utc>);
    /// Narrow the visible timeline range. Optional; renderers without a
    /// zoomable timeline ignore it.
    fn zoom_to(&mut self, _start: DateTime<Utc>, _end: DateTime<Utc>) {}
}

/// Date-picker widget port
pub trait CalendarWidget {
    fn set_enabled_dates(&mut self, dates: &[NaiveDate]);
    /// Currently displayed selection
    fn selection(&self) -> Option<NaiveDate>;
    /// Update the displayed selection; `suppress_callback` prevents the
    /// widget from firing its own on-select handler for this update
    fn set_selection(&mut self, date: NaiveDate, suppress_callback: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapState {
    Idle,
    Snapping,
}

/// One viewer session's calendar/timeline binding
#[derive(Debug)]
pub struct CalendarTimelineSync {
    /// Known delivery dates, sorted ascending, deduplicated
    delivery_dates: Vec<NaiveDate>,
    state: SnapState,
}

impl CalendarTimelineSync {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut delivery_dates: Vec<NaiveDate> = dates.into_iter().collect();
        delivery_dates.sort();
        delivery_dates.dedup();
        Self {
            delivery_dates,
            state: SnapState::Idle,
        }
    }

    pub fn delivery_dates(&self) -> &[NaiveDate] {
        &self.delivery_dates
    }

    /// Whether the picker should render this day as selectable.
    ///
    /// Pure set membership at day granularity.
    pub fn is_enabled(&self, day: NaiveDate) -> bool {
        self.delivery_dates.binary_search(&day).is_ok()
    }

    /// Push the enabled-date set into the widget
    pub fn bind_widget<W: CalendarWidget>(&self, widget: &mut W) {
        widget.set_enabled_dates(&self.delivery_dates);
    }

    /// Whether a snap update is currently being applied
    pub fn is_snapping(&self) -> bool {
        self.state == SnapState::Snapping
    }

    /// Handle a user date selection: snap the clock to noon of the day and
    /// narrow the timeline to ±1 day around it.
    ///
    /// Returns `false` when the call arrived inside a snap window (the
    /// picker echoing back the update we just applied) and was dropped.
    pub fn select_date<C: RendererClock>(&mut self, day: NaiveDate, clock: &mut C) -> bool {
        if self.state == SnapState::Snapping {
            tracing::debug!(%day, "selection during snap window suppressed");
            return false;
        }

        let instant = noon_of_day(day);
        clock.set_current_time(instant);
        clock.zoom_to(instant - Duration::days(1), instant + Duration::days(1));
        true
    }

    /// Handle a renderer clock tick.
    ///
    /// Finds the nearest known delivery date; when it is within tolerance
    /// and differs from the displayed selection by more than the
    /// hysteresis, updates the picker with the callback suppressed.
    /// Returns the snapped date when an update was applied.
    pub fn on_clock_tick<W: CalendarWidget>(
        &mut self,
        t: DateTime<Utc>,
        widget: &mut W,
    ) -> Option<NaiveDate> {
        let nearest = self.nearest_delivery_date(t)?;

        let differs = match widget.selection() {
            None => true,
            Some(displayed) => {
                (nearest - displayed).num_days().abs() > SNAP_HYSTERESIS_DAYS
            }
        };
        if !differs {
            return None;
        }

        self.state = SnapState::Snapping;
        widget.set_selection(nearest, true);
        self.state = SnapState::Idle;
        Some(nearest)
    }

    /// Nearest known delivery date to the instant, if within tolerance.
    ///
    /// Linear scan; the date list is tens to hundreds of entries and this
    /// runs per clock tick, so O(n) is fine. Equal distances keep the
    /// earliest date.
    pub fn nearest_delivery_date(&self, t: DateTime<Utc>) -> Option<NaiveDate> {
        let mut best: Option<(Duration, NaiveDate)> = None;

        for &day in &self.delivery_dates {
            let distance = (t - day_start(day)).abs();
            match best {
                Some((best_distance, _)) if distance >= best_distance => {}
                _ => best = Some((distance, day)),
            }
        }

        best.filter(|(distance, _)| *distance <= Duration::days(SNAP_TOLERANCE_DAYS))
            .map(|(_, day)| day)
    }
}
