//! Valuation timeline synthesis.
//!
//! Two builders produce the chart series: [`history::build_historical_timeline`]
//! replays real trades against real price history; when that yields fewer
//! than two points, [`synthetic::build_synthetic_timeline`] manufactures a
//! plausible two-week path instead.

mod history;
mod synthetic;

pub use history::build_historical_timeline;
pub use synthetic::build_synthetic_timeline;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Historical replay never reaches further back than this.
pub const HISTORY_LOOKBACK_DAYS: i64 = 90;

/// Span of the manufactured path when real history is unusable.
pub const SYNTHETIC_WINDOW_DAYS: i64 = 14;

/// One tick of the valuation chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Drop interior points whose value repeats the previous retained point.
/// The first and last points are anchors and always survive.
pub(crate) fn collapse(points: Vec<TimelinePoint>) -> Vec<TimelinePoint> {
    let total = points.len();
    if total <= 2 {
        return points;
    }
    let mut collapsed: Vec<TimelinePoint> = Vec::with_capacity(total);
    for (i, point) in points.into_iter().enumerate() {
        let is_anchor = i == 0 || i == total - 1;
        match collapsed.last() {
            Some(previous) if !is_anchor && previous.value == point.value => {}
            _ => collapsed.push(point),
        }
    }
    collapsed
}

/// Midnight UTC on the instant's calendar day.
pub(crate) fn floor_to_day(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &t.date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists for every date"),
    )
}

/// Calendar-day grid from `start` to `end` inclusive of `start`, stepping
/// 24 hours.
pub(crate) fn daily_grid(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut days = Vec::new();
    let mut tick = start;
    while tick <= end {
        days.push(tick);
        tick += Duration::days(1);
    }
    days
}
