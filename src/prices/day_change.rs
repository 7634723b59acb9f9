//! Instrument-level day-over-day change.

use super::PricePoint;

/// 24 hours, the lookback between "latest" and its reference observation.
pub const DAY_MS: i64 = 86_400_000;

/// Percent change between the most recent observation and the most recent
/// observation at least 24 hours older.
///
/// Walks backward from the end of the (sorted) series; when no observation
/// is old enough the earliest one serves as the reference. A missing or
/// zero reference price yields `0` rather than a division blowup.
pub fn day_change_percent(points: &[PricePoint]) -> f64 {
    let Some(latest) = points.last() else {
        return 0.0;
    };

    let reference = latest
        .timestamp
        .and_then(|latest_ts| {
            points[..points.len() - 1].iter().rev().find(|point| {
                point
                    .timestamp
                    .is_some_and(|ts| latest_ts.timestamp_millis() - ts.timestamp_millis() >= DAY_MS)
            })
        })
        .or_else(|| points.first());

    match reference {
        Some(reference) if reference.price != 0.0 => {
            (latest.price - reference.price) / reference.price * 100.0
        }
        _ => 0.0,
    }
}
