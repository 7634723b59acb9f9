//! Historical replay: real trades valued against real price history.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::prices::{PriceCursor, PriceSeriesIndex};
use crate::trades::{TradeBook, TradeEvent};

use super::{collapse, daily_grid, floor_to_day, TimelinePoint, HISTORY_LOOKBACK_DAYS};

/// Replay `events` (sorted ascending, unknown timestamps first) across a
/// merged timeline of calendar days, trade instants and the final instant,
/// valuing the book at each tick with forward-filled prices.
///
/// Returns fewer than two points when there is nothing to replay; the
/// caller falls back to the synthetic builder in that case.
pub fn build_historical_timeline(
    events: &[TradeEvent],
    prices: &PriceSeriesIndex,
    fallbacks: &HashMap<String, f64>,
    current_value: f64,
    now: DateTime<Utc>,
) -> Vec<TimelinePoint> {
    let instruments: BTreeSet<&str> = events.iter().map(|e| e.instrument.as_str()).collect();

    let price_timestamps: Vec<DateTime<Utc>> = instruments
        .iter()
        .flat_map(|instrument| {
            prices
                .series(instrument)
                .iter()
                .filter_map(|point| point.timestamp)
        })
        .collect();
    let trade_timestamps: Vec<DateTime<Utc>> =
        events.iter().filter_map(|event| event.timestamp).collect();

    let earliest = price_timestamps
        .iter()
        .chain(trade_timestamps.iter())
        .min()
        .copied();
    let Some(earliest) = earliest else {
        // No dated input anywhere; nothing to anchor a replay on.
        return Vec::new();
    };

    let end = price_timestamps
        .iter()
        .chain(trade_timestamps.iter())
        .max()
        .copied()
        .map_or(now, |latest| latest.max(now));
    let start = floor_to_day(earliest.max(end - Duration::days(HISTORY_LOOKBACK_DAYS)));

    let mut ticks: BTreeSet<DateTime<Utc>> = daily_grid(start, end).into_iter().collect();
    ticks.extend(trade_timestamps.iter().copied().filter(|ts| *ts >= start));
    ticks.insert(end);

    let mut cursors: HashMap<&str, PriceCursor<'_>> = instruments
        .iter()
        .map(|instrument| (*instrument, prices.cursor(instrument)))
        .collect();
    let mut book = TradeBook::new();
    let mut next_event = 0usize;

    let mut points: Vec<TimelinePoint> = Vec::with_capacity(ticks.len());
    for tick in ticks {
        while next_event < events.len()
            && events[next_event].timestamp.map_or(true, |ts| ts <= tick)
        {
            book.apply(&events[next_event]);
            next_event += 1;
        }

        let mut value = 0.0;
        for instrument in &instruments {
            let quantity = book.quantity(instrument);
            if quantity <= 0.0 {
                continue;
            }
            let price = cursors
                .get_mut(instrument)
                .and_then(|cursor| cursor.price_at(tick))
                .or_else(|| fallbacks.get(*instrument).copied())
                .unwrap_or_else(|| book.average_cost(instrument));
            value += quantity * price.max(0.0);
        }
        points.push(TimelinePoint {
            timestamp: tick,
            value,
        });
    }

    // The chart must end exactly at the live number even when price history
    // lags behind the latest trades.
    if let Some(last) = points.last_mut() {
        last.value = current_value;
    }

    trace!(ticks = points.len(), "historical replay complete");
    collapse(points)
}
