use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline::TimelinePoint;
use crate::trades::TradeAction;

/// A currently-held instrument with its cost basis and live valuation.
/// Positions with zero (or clamped-to-zero) quantity never appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingPosition {
    pub instrument: String,
    pub quantity: f64,
    pub average_cost: f64,
    pub current_price: f64,
    pub total_value: f64,
    pub total_cost: f64,
    pub unrealized_pnl: f64,
    pub day_change_percent: f64,
}

/// A normalized trade prepared for display, newest first.
///
/// `timestamp` is the resolved display instant; when the upstream value was
/// unparseable it falls back to "now" so the record still renders, with
/// `raw_timestamp` carrying whatever text the feed originally sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub instrument: String,
    pub action: TradeAction,
    pub quantity: f64,
    pub unit_price: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_timestamp: Option<String>,
}

/// The reconstructed account snapshot. Every numeric field is a finite
/// float; absent upstream data degrades to zero or the named defaults
/// rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub holdings: Vec<HoldingPosition>,
    pub cash_balance: f64,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_unrealized_pnl: f64,
    pub initial_deposit: f64,
    pub day_change_value: f64,
    pub day_change_percent: f64,
    pub chart_points: Vec<TimelinePoint>,
    pub transactions: Vec<TransactionRecord>,
}
