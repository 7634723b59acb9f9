//! Ordered fallback chains reconciling reported, derived and inferred
//! account figures.
//!
//! Each resolver walks an explicit precedence list and takes the first
//! usable candidate, logging which source won so disagreements between the
//! feeds stay auditable.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::coerce::{coerce_f64, coerce_opt_f64};
use crate::feeds::ReportedAccountState;
use crate::instant::parse_instant;
use crate::prices::DAY_MS;
use crate::timeline::TimelinePoint;

/// Starting balance assumed when no feed reports one.
pub const DEFAULT_INITIAL_DEPOSIT: f64 = 10_000.0;

/// Reported balances this close to zero on the negative side are treated as
/// floating-point residue.
const ZERO_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HistoryPoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub balance: f64,
}

/// The reported account state with every field already coerced, history
/// sorted ascending (unknown timestamps first).
#[derive(Debug, Clone, Default)]
pub(crate) struct ReportedFields {
    pub balance: Option<f64>,
    pub cash_balance: Option<f64>,
    pub total_value: Option<f64>,
    pub initial_deposit: Option<f64>,
    pub history: Vec<HistoryPoint>,
}

impl ReportedFields {
    pub fn parse(reported: Option<&ReportedAccountState>) -> Self {
        let Some(state) = reported else {
            return Self::default();
        };
        let mut history: Vec<HistoryPoint> = state
            .history
            .iter()
            .map(|point| HistoryPoint {
                timestamp: parse_instant(&point.timestamp),
                balance: coerce_f64(&point.balance, 0.0),
            })
            .collect();
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Self {
            balance: coerce_opt_f64(&state.balance),
            cash_balance: coerce_opt_f64(&state.cash_balance),
            total_value: coerce_opt_f64(&state.total_value),
            initial_deposit: coerce_opt_f64(&state.initial_deposit),
            history,
        }
    }
}

/// Cash balance: latest balance-history point, else a directly reported
/// balance field, else the reported total minus computed holdings, else 0.
pub(crate) fn resolve_cash_balance(reported: &ReportedFields, holdings_value: f64) -> f64 {
    let cash = if let Some(point) = reported.history.last() {
        debug!(balance = point.balance, "cash balance from balance history");
        point.balance
    } else if let Some(balance) = reported.balance.or(reported.cash_balance) {
        debug!(balance, "cash balance from reported field");
        balance
    } else if let Some(total) = reported.total_value {
        debug!(total, holdings_value, "cash balance inferred from reported total");
        total - holdings_value
    } else {
        0.0
    };

    if cash < 0.0 && cash > -ZERO_TOLERANCE {
        0.0
    } else {
        cash
    }
}

/// Total account value: latest balance-history point, else the reported
/// total, else computed holdings plus cash.
pub(crate) fn resolve_total_value(
    reported: &ReportedFields,
    holdings_value: f64,
    cash_balance: f64,
) -> f64 {
    if let Some(point) = reported.history.last() {
        debug!(value = point.balance, "total value from balance history");
        point.balance
    } else if let Some(total) = reported.total_value {
        debug!(total, "total value from reported field");
        total
    } else {
        holdings_value + cash_balance
    }
}

/// Initial deposit, in order: the reported field, the earliest
/// balance-history point, cash plus total cost, cash minus net trade flow,
/// then the fixed default. Candidates must be finite and positive.
pub(crate) fn resolve_initial_deposit(
    reported: &ReportedFields,
    cash_balance: f64,
    total_cost: f64,
    net_trade_flow: f64,
) -> f64 {
    let candidates = [
        ("reported", reported.initial_deposit),
        (
            "history",
            reported.history.first().map(|point| point.balance),
        ),
        ("cash plus cost basis", Some(cash_balance + total_cost)),
        ("cash minus trade flow", Some(cash_balance - net_trade_flow)),
    ];
    for (source, candidate) in candidates {
        if let Some(deposit) = candidate.filter(|d| d.is_finite() && *d > 0.0) {
            debug!(source, deposit, "resolved initial deposit");
            return deposit;
        }
    }
    DEFAULT_INITIAL_DEPOSIT
}

/// Day change value and percent.
///
/// Prefers the server-reported balance history (latest point against the
/// most recent point at least 24h older, else against the initial deposit);
/// without any history, the constructed chart provides the same lookback.
/// No chart at all means no movement to report.
pub(crate) fn resolve_day_change(
    reported: &ReportedFields,
    chart: &[TimelinePoint],
    initial_deposit: f64,
) -> (f64, f64) {
    let (latest, reference) = if let Some(latest) = reported.history.last() {
        let len = reported.history.len();
        let reference = latest
            .timestamp
            .and_then(|latest_ts| {
                reported.history[..len - 1].iter().rev().find(|point| {
                    point.timestamp.is_some_and(|ts| {
                        latest_ts.timestamp_millis() - ts.timestamp_millis() >= DAY_MS
                    })
                })
            })
            .map(|point| point.balance);
        (latest.balance, reference.unwrap_or(initial_deposit))
    } else if let Some(latest) = chart.last() {
        let len = chart.len();
        let reference = chart[..len - 1]
            .iter()
            .rev()
            .find(|point| {
                latest.timestamp.timestamp_millis() - point.timestamp.timestamp_millis() >= DAY_MS
            })
            .map(|point| point.value);
        (latest.value, reference.unwrap_or(initial_deposit))
    } else {
        return (0.0, 0.0);
    };

    let change = latest - reference;
    let percent = if reference > 0.0 {
        change / reference * 100.0
    } else {
        0.0
    };
    (change, percent)
}
