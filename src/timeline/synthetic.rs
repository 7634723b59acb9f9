//! Synthetic fallback: a plausible two-week path when real history is
//! unusable (brand-new accounts, price feeds that have not caught up yet).

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::{collapse, floor_to_day, TimelinePoint, SYNTHETIC_WINDOW_DAYS};

/// Manufacture a chart from whatever the historical replay managed to
/// produce (zero or one points).
///
/// With no usable history at all the result is exactly two points: the
/// estimated starting balance two weeks ago and the current holdings value
/// now. With sparse history, a daily step-function fills a two-week window
/// ending at the latest known timestamp, starting from the estimated
/// deposit when the window head has no data, and the final point is forced
/// to the live value.
pub fn build_synthetic_timeline(
    history: &[TimelinePoint],
    estimated_deposit: f64,
    current_value: f64,
    now: DateTime<Utc>,
) -> Vec<TimelinePoint> {
    if history.is_empty() {
        debug!("no usable history; emitting two-point synthetic path");
        return vec![
            TimelinePoint {
                timestamp: now - Duration::days(SYNTHETIC_WINDOW_DAYS),
                value: estimated_deposit,
            },
            TimelinePoint {
                timestamp: now,
                value: current_value,
            },
        ];
    }

    let window_end = history
        .iter()
        .map(|point| point.timestamp)
        .max()
        .unwrap_or(now);
    let window_start = floor_to_day(window_end - Duration::days(SYNTHETIC_WINDOW_DAYS));
    debug!(%window_start, %window_end, "filling synthetic window from sparse history");

    let mut points = Vec::new();
    let mut known = history.iter().peekable();
    let mut carried = None;
    let mut tick = window_start;
    while tick <= window_end {
        while let Some(point) = known.peek() {
            if point.timestamp <= tick {
                carried = Some(point.value);
                known.next();
            } else {
                break;
            }
        }
        points.push(TimelinePoint {
            timestamp: tick,
            value: carried.unwrap_or(estimated_deposit),
        });
        tick += Duration::days(1);
    }
    if points.last().map(|point| point.timestamp) != Some(window_end) {
        points.push(TimelinePoint {
            timestamp: window_end,
            value: carried.unwrap_or(estimated_deposit),
        });
    }

    if let Some(last) = points.last_mut() {
        last.value = current_value;
    }
    collapse(points)
}
