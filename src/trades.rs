//! Trade normalization and replay.
//!
//! Converts heterogeneous trade or position records into a canonical,
//! timestamp-ordered event list, then replays that list to track
//! per-instrument quantity and cost basis. Records are never dropped:
//! missing fields coerce to zero/neutral and unparseable timestamps sort to
//! the "unknown/earliest" position.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coerce::{coerce_f64, coerce_opt_f64, value_string};
use crate::feeds::{RawPosition, RawTrade};
use crate::instant::parse_instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    /// Anything that is not recognizably a sell counts as a buy; the feed
    /// has been seen emitting casing variants and the occasional blank.
    fn from_raw(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("sell") {
            TradeAction::Sell
        } else {
            TradeAction::Buy
        }
    }
}

/// A normalized trade event.
///
/// `timestamp` is `None` when the upstream value could not be parsed; such
/// events sort before every dated event so chronological replay consumes
/// them first, while `raw_timestamp` keeps the original text for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub id: String,
    pub instrument: String,
    pub action: TradeAction,
    pub quantity: f64,
    pub unit_price: f64,
    pub timestamp: Option<DateTime<Utc>>,
    pub average_buy_price: Option<f64>,
    pub raw_timestamp: Option<String>,
}

impl TradeEvent {
    fn from_trade(raw: &RawTrade) -> Self {
        Self {
            id: value_string(&raw.id).unwrap_or_default(),
            instrument: raw.instrument_name.trim().to_string(),
            action: TradeAction::from_raw(&raw.action),
            quantity: coerce_f64(&raw.quantity, 0.0).max(0.0),
            unit_price: coerce_f64(&raw.price, 0.0).max(0.0),
            timestamp: parse_instant(&raw.timestamp),
            average_buy_price: coerce_opt_f64(&raw.average_buy_price),
            raw_timestamp: value_string(&raw.timestamp),
        }
    }

    /// A position becomes one synthetic buy dated at its last transaction.
    /// The id is derived from the instrument so repeated runs over the same
    /// inputs produce identical events.
    fn from_position(raw: &RawPosition) -> Self {
        let average_price = coerce_opt_f64(&raw.average_price)
            .or_else(|| coerce_opt_f64(&raw.average_buy_price))
            .unwrap_or(0.0);
        Self {
            id: format!("position-{}", raw.instrument_name.trim()),
            instrument: raw.instrument_name.trim().to_string(),
            action: TradeAction::Buy,
            quantity: coerce_f64(&raw.quantity, 0.0).max(0.0),
            unit_price: average_price.max(0.0),
            timestamp: parse_instant(&raw.last_transaction_timestamp),
            average_buy_price: Some(average_price.max(0.0)),
            raw_timestamp: value_string(&raw.last_transaction_timestamp),
        }
    }
}

/// Normalize the trade ledger, or fall back to treating each current
/// position as an implicit buy when no ledger exists. Output is sorted
/// ascending by timestamp with unknown timestamps first; the sort is stable
/// so same-instant events keep feed order.
pub fn normalize_trades(trades: &[RawTrade], positions: &[RawPosition]) -> Vec<TradeEvent> {
    let mut events: Vec<TradeEvent> = if trades.is_empty() {
        positions.iter().map(TradeEvent::from_position).collect()
    } else {
        trades.iter().map(TradeEvent::from_trade).collect()
    };
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    events
}

/// Per-instrument price to fall back on when an instrument has no price
/// series at all: position current price, else its average price, else
/// position value divided by quantity.
pub fn fallback_prices(positions: &[RawPosition]) -> HashMap<String, f64> {
    let mut fallbacks = HashMap::new();
    for position in positions {
        let instrument = position.instrument_name.trim();
        if instrument.is_empty() {
            continue;
        }
        let quantity = coerce_f64(&position.quantity, 0.0);
        let per_unit_value = coerce_opt_f64(&position.position_value)
            .filter(|_| quantity > 0.0)
            .map(|value| value / quantity);
        let candidate = coerce_opt_f64(&position.current_price)
            .or_else(|| coerce_opt_f64(&position.average_price))
            .or_else(|| coerce_opt_f64(&position.average_buy_price))
            .or(per_unit_value);
        if let Some(price) = candidate.filter(|p| p.is_finite() && *p > 0.0) {
            fallbacks.insert(instrument.to_string(), price);
        }
    }
    fallbacks
}

#[derive(Debug, Clone, Default)]
struct BookEntry {
    quantity: f64,
    buy_cost: f64,
    buy_quantity: f64,
}

/// Running replay state: per-instrument net quantity and cost basis.
///
/// Average cost is total buy cost over total buy quantity; sells reduce the
/// net quantity (floored at zero) but never the average.
#[derive(Debug, Clone, Default)]
pub struct TradeBook {
    entries: HashMap<String, BookEntry>,
}

impl TradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &TradeEvent) {
        let entry = self.entries.entry(event.instrument.clone()).or_default();
        match event.action {
            TradeAction::Buy => {
                entry.quantity += event.quantity;
                entry.buy_cost += event.quantity * event.unit_price;
                entry.buy_quantity += event.quantity;
            }
            TradeAction::Sell => {
                entry.quantity = (entry.quantity - event.quantity).max(0.0);
            }
        }
    }

    pub fn quantity(&self, instrument: &str) -> f64 {
        self.entries
            .get(instrument)
            .map(|e| e.quantity)
            .unwrap_or(0.0)
    }

    pub fn average_cost(&self, instrument: &str) -> f64 {
        self.entries
            .get(instrument)
            .filter(|e| e.buy_quantity > 0.0)
            .map(|e| e.buy_cost / e.buy_quantity)
            .unwrap_or(0.0)
    }

    /// Instruments currently held, with their net quantity, in a stable
    /// (sorted) order.
    pub fn held(&self) -> Vec<(String, f64)> {
        let mut held: Vec<(String, f64)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.quantity > 0.0)
            .map(|(instrument, e)| (instrument.clone(), e.quantity))
            .collect();
        held.sort_by(|a, b| a.0.cmp(&b.0));
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw_trade(instrument: &str, action: &str, quantity: f64, price: f64, ts: &str) -> RawTrade {
        serde_json::from_value(json!({
            "id": format!("{instrument}-{action}-{ts}"),
            "instrument_name": instrument,
            "action": action,
            "quantity": quantity,
            "price": price,
            "timestamp": ts,
        }))
        .unwrap()
    }

    #[test]
    fn trades_sort_ascending_with_unknown_first() {
        let trades = vec![
            raw_trade("KC", "buy", 2.0, 110.0, "2025-11-05"),
            raw_trade("KC", "buy", 1.0, 100.0, "not a date"),
            raw_trade("KC", "buy", 3.0, 90.0, "2025-11-01"),
        ];
        let events = normalize_trades(&trades, &[]);
        assert_eq!(events[0].timestamp, None);
        assert_eq!(events[0].raw_timestamp.as_deref(), Some("not a date"));
        assert_eq!(
            events[1].timestamp,
            Some(Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap())
        );
        assert!(events[1].timestamp < events[2].timestamp);
    }

    #[test]
    fn positions_become_synthetic_buys() {
        let positions: Vec<RawPosition> = serde_json::from_value(json!([
            {"instrumentName": "GB", "quantity": 4, "averagePrice": "$25.00",
             "lastTransactionTimestamp": "2025-10-20T12:00:00Z"}
        ]))
        .unwrap();
        let events = normalize_trades(&[], &positions);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, TradeAction::Buy);
        assert_eq!(events[0].quantity, 4.0);
        assert_eq!(events[0].unit_price, 25.0);
        assert_eq!(events[0].id, "position-GB");
    }

    #[test]
    fn positions_are_ignored_when_a_ledger_exists() {
        let trades = vec![raw_trade("KC", "buy", 1.0, 50.0, "2025-11-01")];
        let positions: Vec<RawPosition> =
            serde_json::from_value(json!([{"instrumentName": "GB", "quantity": 4}])).unwrap();
        let events = normalize_trades(&trades, &positions);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].instrument, "KC");
    }

    #[test]
    fn malformed_records_are_kept_with_neutral_values() {
        let trades: Vec<RawTrade> = serde_json::from_value(json!([{}])).unwrap();
        let events = normalize_trades(&trades, &[]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].quantity, 0.0);
        assert_eq!(events[0].unit_price, 0.0);
        assert_eq!(events[0].timestamp, None);
        assert_eq!(events[0].action, TradeAction::Buy);
    }

    #[test]
    fn book_tracks_average_cost_over_buys_only() {
        let mut book = TradeBook::new();
        for event in normalize_trades(
            &[
                raw_trade("KC", "buy", 2.0, 100.0, "2025-11-01"),
                raw_trade("KC", "buy", 2.0, 120.0, "2025-11-02"),
                raw_trade("KC", "sell", 1.0, 130.0, "2025-11-03"),
            ],
            &[],
        ) {
            book.apply(&event);
        }
        assert_eq!(book.quantity("KC"), 3.0);
        assert_eq!(book.average_cost("KC"), 110.0);
    }

    #[test]
    fn oversells_clamp_at_zero() {
        let mut book = TradeBook::new();
        for event in normalize_trades(
            &[
                raw_trade("KC", "buy", 1.0, 100.0, "2025-11-01"),
                raw_trade("KC", "sell", 5.0, 100.0, "2025-11-02"),
            ],
            &[],
        ) {
            book.apply(&event);
        }
        assert_eq!(book.quantity("KC"), 0.0);
        assert!(book.held().is_empty());
    }

    #[test]
    fn fallback_price_prefers_current_price() {
        let positions: Vec<RawPosition> = serde_json::from_value(json!([
            {"instrumentName": "KC", "quantity": 2, "averagePrice": 90, "currentPrice": "$95.50"},
            {"instrumentName": "GB", "quantity": 4, "positionValue": 100},
            {"instrumentName": "DAL"}
        ]))
        .unwrap();
        let fallbacks = fallback_prices(&positions);
        assert_eq!(fallbacks.get("KC"), Some(&95.5));
        assert_eq!(fallbacks.get("GB"), Some(&25.0));
        assert_eq!(fallbacks.get("DAL"), None);
    }
}
