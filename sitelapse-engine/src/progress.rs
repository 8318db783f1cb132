//! Weekly progress timeseries
//!
//! Parses the published weekly construction plan (a comma-delimited table
//! exported from a spreadsheet) into per-week accumulated percentages, and
//! answers "what are plan/real/forecast/diff at instant T" for the HUD.
//!
//! Column layout is positional, not header-driven: the export's header
//! row repeats labels and is only sanity-logged. Week windows are anchored
//! to a configured week-number/date pair because the spreadsheet numbers
//! weeks from a project-specific origin.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sitelapse_common::config::WeeklyPlanConfig;
use sitelapse_common::time::{end_of_day, start_of_day};
use sitelapse_common::TimeWindow;

/// Column indices in the exported table
const WEEK_COL: usize = 0;
const PLAN_ACCUM_COL: usize = 2;
const REAL_ACCUM_COL: usize = 5;
const FORECAST_ACCUM_COL: usize = 8;

/// Accumulated percentages for one plan week
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyProgressSample {
    pub week: u32,
    /// Week window: start of first day through end of seventh day
    pub window: TimeWindow,
    pub plan_accumulated: f64,
    pub real_accumulated: f64,
    pub forecast_accumulated: f64,
    /// `real - plan`, precomputed at ingest
    pub diff_accumulated: f64,
}

/// Result of a progress query at one instant
///
/// `is_forecast` says whether `real` is an actual measurement or a
/// substituted forecast value; the HUD renders the "real" bar differently
/// in the two cases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressQueryResult {
    pub plan: f64,
    pub real: f64,
    pub forecast: f64,
    pub diff: f64,
    pub is_forecast: bool,
}

impl ProgressQueryResult {
    fn zero() -> Self {
        Self {
            plan: 0.0,
            real: 0.0,
            forecast: 0.0,
            diff: 0.0,
            is_forecast: true,
        }
    }
}

/// Parsed weekly progress data for one project
#[derive(Debug, Clone)]
pub struct ProgressTimeseries {
    samples: Vec<WeeklyProgressSample>,
    max_accumulated_percentage: f64,
}

impl Default for ProgressTimeseries {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            // The neutral scale: empty data still renders 0-width bars
            // against a 100% axis
            max_accumulated_percentage: 100.0,
        }
    }
}

impl ProgressTimeseries {
    /// Parse the exported table.
    ///
    /// Rows with fewer columns than the rightmost required index, and rows
    /// whose week label contains no digits, are skipped; a skipped row
    /// never aborts the parse. Percentage cells may carry a `%` suffix and
    /// default to 0.0 when unparseable, so no NaN can enter the series.
    pub fn ingest(raw: &str, plan: &WeeklyPlanConfig) -> Self {
        let mut lines = raw.trim().lines();

        let Some(header) = lines.next() else {
            tracing::warn!("empty progress table");
            return Self::default();
        };
        tracing::debug!(
            columns = header.split(',').count(),
            "ingesting progress table"
        );

        let required_columns = FORECAST_ACCUM_COL + 1;
        let mut samples = Vec::new();
        let mut max_plan: f64 = 0.0;

        for row in lines {
            let cells: Vec<&str> = row.split(',').collect();
            if cells.len() < required_columns {
                continue;
            }

            let Some(week) = first_digit_run(cells[WEEK_COL]) else {
                continue;
            };

            let plan_accumulated = parse_percentage(cells[PLAN_ACCUM_COL]);
            let real_accumulated = parse_percentage(cells[REAL_ACCUM_COL]);
            let forecast_accumulated = parse_percentage(cells[FORECAST_ACCUM_COL]);

            samples.push(WeeklyProgressSample {
                week,
                window: week_window(week, plan),
                plan_accumulated,
                real_accumulated,
                forecast_accumulated,
                diff_accumulated: real_accumulated - plan_accumulated,
            });

            if plan_accumulated > max_plan {
                max_plan = plan_accumulated;
            }
        }

        samples.sort_by_key(|s| s.week);

        Self {
            samples,
            // Bars scale against the largest planned value; default to 100
            // when no plan exists yet so nothing divides by zero
            max_accumulated_percentage: if max_plan > 0.0 { max_plan } else { 100.0 },
        }
    }

    pub fn samples(&self) -> &[WeeklyProgressSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest planned accumulated percentage, for HUD bar scaling
    pub fn max_accumulated_percentage(&self) -> f64 {
        self.max_accumulated_percentage
    }

    /// Resolve plan/real/forecast/diff at one instant.
    ///
    /// The *current* sample is the last one whose window start is at or
    /// before the instant; the scan stops early when the instant also
    /// falls inside that sample's window. With no such sample (instant
    /// precedes all data) the result is all zeros flagged as forecast.
    ///
    /// Fallback policy, in evaluation order (the order is part of the
    /// contract — at exactly the window end both case 1 and case 2 match,
    /// and case 1 wins):
    ///
    /// 1. The week has an actual (`real > 0`) and the instant is at or
    ///    before the week's end: the sample's own values, verbatim.
    /// 2. The week has no actual, the instant is at or past the week's
    ///    end, and an earlier week has an actual: carry the last known
    ///    actual forward as both `real` and `forecast`.
    /// 3. Otherwise (future week, or current week with no actual and
    ///    nothing to carry forward): substitute the forecast for `real`.
    pub fn query_at(&self, instant: DateTime<Utc>) -> ProgressQueryResult {
        let mut current: Option<&WeeklyProgressSample> = None;
        // Last sample before `current` with a real measurement
        let mut carry: Option<&WeeklyProgressSample> = None;

        for sample in &self.samples {
            if instant >= sample.window.start {
                if let Some(prev) = current {
                    if prev.real_accumulated > 0.0 {
                        carry = Some(prev);
                    }
                }
                current = Some(sample);
                if instant <= sample.window.end {
                    break;
                }
            } else {
                break;
            }
        }

        let Some(current) = current else {
            return ProgressQueryResult::zero();
        };

        let plan = current.plan_accumulated;
        let real = current.real_accumulated;
        let forecast = current.forecast_accumulated;

        if real > 0.0 && instant <= current.window.end {
            // Case 1: the week's own actuals
            ProgressQueryResult {
                plan,
                real,
                forecast,
                diff: current.diff_accumulated,
                is_forecast: false,
            }
        } else if real == 0.0 && instant >= current.window.end {
            if let Some(carry) = carry {
                // Case 2: carry the last measured week forward wholesale —
                // its actual substitutes for both real and forecast, and
                // plan stays paired with it so diff keeps meaning
                // "measured minus planned"
                let plan = carry.plan_accumulated;
                let real = carry.real_accumulated;
                ProgressQueryResult {
                    plan,
                    real,
                    forecast: real,
                    diff: real - plan,
                    is_forecast: false,
                }
            } else {
                ProgressQueryResult {
                    plan,
                    real: forecast,
                    forecast,
                    diff: forecast - plan,
                    is_forecast: true,
                }
            }
        } else {
            // Case 3: no actual yet, show the forecast
            ProgressQueryResult {
                plan,
                real: forecast,
                forecast,
                diff: forecast - plan,
                is_forecast: true,
            }
        }
    }
}

/// Week window derived from the configured anchor
fn week_window(week: u32, plan: &WeeklyPlanConfig) -> TimeWindow {
    let offset_weeks = i64::from(week) - i64::from(plan.anchor_week);
    let start = start_of_day(plan.anchor_start + Duration::weeks(offset_weeks));
    let end = end_of_day(start + Duration::days(6));
    TimeWindow::new(start, end)
}

/// First run of digits in a cell, e.g. `"Semana 12"` → 12
fn first_digit_run(cell: &str) -> Option<u32> {
    let digits: String = cell
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parse `"12.34%"` (or `"12.34"`) to 12.34; anything else is 0.0
fn parse_percentage(cell: &str) -> f64 {
    let parsed: f64 = cell.trim().trim_end_matches('%').trim().parse().unwrap_or(0.0);
    if parsed.is_nan() {
        0.0
    } else {
        parsed
    }
}
