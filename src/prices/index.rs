//! Per-instrument price series with point-in-time lookup.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coerce::coerce_opt_f64;
use crate::feeds::RawPriceObservation;
use crate::instant::parse_instant;

/// One observation in a per-instrument series. `timestamp` is `None` when
/// the feed supplied an unparseable one; such points sort first and behave
/// as "earliest/unknown".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub price: f64,
}

/// Immutable index of price observations grouped by instrument, each series
/// sorted ascending with consecutive duplicate timestamps collapsed to the
/// later value.
#[derive(Debug, Clone, Default)]
pub struct PriceSeriesIndex {
    series: HashMap<String, Vec<PricePoint>>,
}

impl PriceSeriesIndex {
    pub fn build(observations: &[RawPriceObservation]) -> Self {
        let mut grouped: HashMap<String, Vec<PricePoint>> = HashMap::new();
        for observation in observations {
            let instrument = observation.instrument_name.trim();
            if instrument.is_empty() {
                continue;
            }
            // The market table carries both `value` and `price`; `value`
            // wins when it is usable.
            let price = coerce_opt_f64(&observation.value)
                .or_else(|| coerce_opt_f64(&observation.price))
                .unwrap_or(0.0);
            grouped
                .entry(instrument.to_string())
                .or_default()
                .push(PricePoint {
                    timestamp: parse_instant(&observation.timestamp),
                    price,
                });
        }

        for series in grouped.values_mut() {
            series.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            series.dedup_by(|later, earlier| {
                // dedup_by sees (later, earlier); keeping the later value
                // means overwriting the retained element before the drop.
                if later.timestamp == earlier.timestamp {
                    earlier.price = later.price;
                    true
                } else {
                    false
                }
            });
        }

        Self { series: grouped }
    }

    pub fn series(&self, instrument: &str) -> &[PricePoint] {
        self.series
            .get(instrument)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn latest(&self, instrument: &str) -> Option<&PricePoint> {
        self.series(instrument).last()
    }

    /// A fresh forward-fill cursor for one timeline walk. Cursors are
    /// monotonic; never reuse one across independent walks.
    pub fn cursor(&self, instrument: &str) -> PriceCursor<'_> {
        PriceCursor {
            points: self.series(instrument),
            index: 0,
        }
    }

    /// Earliest valid observation timestamp across all instruments.
    pub fn earliest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.series
            .values()
            .flat_map(|points| points.iter().filter_map(|p| p.timestamp))
            .min()
    }

    /// Latest valid observation timestamp across all instruments.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.series
            .values()
            .flat_map(|points| points.iter().filter_map(|p| p.timestamp))
            .max()
    }
}

/// Monotonic forward-fill cursor over one instrument's series.
///
/// Must be queried with a non-decreasing sequence of instants within a
/// single walk. Returns the latest observation not after `t`; for `t`
/// before the first observation, the first observation's price (head
/// back-fill); `None` only when the instrument has no observations at all.
#[derive(Debug)]
pub struct PriceCursor<'a> {
    points: &'a [PricePoint],
    index: usize,
}

impl PriceCursor<'_> {
    pub fn price_at(&mut self, t: DateTime<Utc>) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        while self.index + 1 < self.points.len()
            && self.points[self.index + 1]
                .timestamp
                .map_or(true, |ts| ts <= t)
        {
            self.index += 1;
        }
        Some(self.points[self.index].price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn observations(entries: &[(&str, f64, &str)]) -> Vec<RawPriceObservation> {
        entries
            .iter()
            .map(|(instrument, price, ts)| {
                serde_json::from_value(json!({
                    "instrument_name": instrument,
                    "price": price,
                    "timestamp": ts,
                }))
                .unwrap()
            })
            .collect()
    }

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn series_are_grouped_and_sorted() {
        let index = PriceSeriesIndex::build(&observations(&[
            ("KC", 120.0, "2025-11-03"),
            ("GB", 30.0, "2025-11-01"),
            ("KC", 100.0, "2025-11-01"),
        ]));
        let kc = index.series("KC");
        assert_eq!(kc.len(), 2);
        assert_eq!(kc[0].price, 100.0);
        assert_eq!(kc[1].price, 120.0);
        assert_eq!(index.series("GB").len(), 1);
        assert!(index.series("DAL").is_empty());
    }

    #[test]
    fn duplicate_timestamps_collapse_to_last_value() {
        let index = PriceSeriesIndex::build(&observations(&[
            ("KC", 100.0, "2025-11-01"),
            ("KC", 105.0, "2025-11-01"),
        ]));
        let kc = index.series("KC");
        assert_eq!(kc.len(), 1);
        assert_eq!(kc[0].price, 105.0);
    }

    #[test]
    fn value_field_wins_over_price() {
        let raw: Vec<RawPriceObservation> = serde_json::from_value(json!([
            {"instrument_name": "KC", "price": 100, "value": "101.5", "timestamp": "2025-11-01"}
        ]))
        .unwrap();
        let index = PriceSeriesIndex::build(&raw);
        assert_eq!(index.series("KC")[0].price, 101.5);
    }

    #[test]
    fn cursor_forward_fills() {
        let index = PriceSeriesIndex::build(&observations(&[
            ("KC", 100.0, "2025-11-01"),
            ("KC", 120.0, "2025-11-03"),
            ("KC", 130.0, "2025-11-07"),
        ]));
        let mut cursor = index.cursor("KC");
        // before the head: back-fill to the first observation
        assert_eq!(cursor.price_at(utc(2025, 10, 20)), Some(100.0));
        assert_eq!(cursor.price_at(utc(2025, 11, 1)), Some(100.0));
        assert_eq!(cursor.price_at(utc(2025, 11, 2)), Some(100.0));
        assert_eq!(cursor.price_at(utc(2025, 11, 3)), Some(120.0));
        assert_eq!(cursor.price_at(utc(2025, 11, 5)), Some(120.0));
        // after the tail: forward-fill the last observation
        assert_eq!(cursor.price_at(utc(2025, 12, 25)), Some(130.0));
    }

    #[test]
    fn cursor_on_unknown_instrument_yields_nothing() {
        let index = PriceSeriesIndex::build(&[]);
        let mut cursor = index.cursor("KC");
        assert_eq!(cursor.price_at(utc(2025, 11, 1)), None);
    }

    #[test]
    fn untimed_observations_sort_first() {
        let raw: Vec<RawPriceObservation> = serde_json::from_value(json!([
            {"instrument_name": "KC", "price": 80, "timestamp": "???"},
            {"instrument_name": "KC", "price": 100, "timestamp": "2025-11-01"}
        ]))
        .unwrap();
        let index = PriceSeriesIndex::build(&raw);
        let kc = index.series("KC");
        assert_eq!(kc[0].timestamp, None);
        assert_eq!(kc[0].price, 80.0);
        let mut cursor = index.cursor("KC");
        // the untimed point acts as "earliest"; a dated query moves past it
        assert_eq!(cursor.price_at(utc(2025, 11, 2)), Some(100.0));
        assert_eq!(index.earliest_timestamp(), Some(utc(2025, 11, 1)));
    }
}
