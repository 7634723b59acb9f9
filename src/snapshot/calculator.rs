use std::sync::Arc;

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::feeds::SnapshotInputs;
use crate::prices::{day_change_percent, PriceSeriesIndex};
use crate::timeline::{build_historical_timeline, build_synthetic_timeline};
use crate::trades::{fallback_prices, normalize_trades, TradeAction, TradeBook};

use super::models::{HoldingPosition, PortfolioSnapshot, TransactionRecord};
use super::precedence::{
    resolve_cash_balance, resolve_day_change, resolve_initial_deposit, resolve_total_value,
    ReportedFields, DEFAULT_INITIAL_DEPOSIT,
};

/// Top-level entry point: one call reconstructs one snapshot from whatever
/// the caller managed to retrieve.
///
/// The computation is pure and synchronous; nothing is cached between
/// calls, so identical inputs always produce identical snapshots.
pub struct SnapshotCalculator {
    clock: Arc<dyn Clock>,
}

impl SnapshotCalculator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn calculate(&self, inputs: &SnapshotInputs) -> PortfolioSnapshot {
        let now = self.clock.now();
        let events = normalize_trades(&inputs.trades, &inputs.positions);
        let index = PriceSeriesIndex::build(&inputs.prices);
        let fallbacks = fallback_prices(&inputs.positions);
        let reported = ReportedFields::parse(inputs.reported.as_ref());

        let mut book = TradeBook::new();
        for event in &events {
            book.apply(event);
        }

        let mut holdings = Vec::new();
        for (instrument, quantity) in book.held() {
            let average_cost = book.average_cost(&instrument);
            let current_price = index
                .latest(&instrument)
                .map(|point| point.price)
                .or_else(|| fallbacks.get(&instrument).copied())
                .unwrap_or(average_cost)
                .max(0.0);
            let total_value = quantity * current_price;
            let total_cost = quantity * average_cost;
            let unrealized_pnl = total_value - total_cost;
            let day_change = if total_cost > 0.0 {
                unrealized_pnl / total_cost * 100.0
            } else {
                day_change_percent(index.series(&instrument))
            };
            holdings.push(HoldingPosition {
                instrument,
                quantity,
                average_cost,
                current_price,
                total_value: finite_or_zero(total_value),
                total_cost: finite_or_zero(total_cost),
                unrealized_pnl: finite_or_zero(unrealized_pnl),
                day_change_percent: finite_or_zero(day_change),
            });
        }

        let holdings_value: f64 = holdings.iter().map(|h| h.total_value).sum();
        let total_cost: f64 = holdings.iter().map(|h| h.total_cost).sum();

        let mut chart = build_historical_timeline(&events, &index, &fallbacks, holdings_value, now);
        if chart.len() < 2 {
            // Without any input signal there is no account to chart; with
            // one, manufacture the two-week fallback path.
            let any_signal =
                !events.is_empty() || !inputs.prices.is_empty() || inputs.reported.is_some();
            if any_signal {
                let estimated_deposit = reported
                    .initial_deposit
                    .filter(|d| *d > 0.0)
                    .unwrap_or(DEFAULT_INITIAL_DEPOSIT);
                debug!(
                    replay_points = chart.len(),
                    estimated_deposit, "historical replay too sparse; using synthetic timeline"
                );
                chart = build_synthetic_timeline(&chart, estimated_deposit, holdings_value, now);
            } else {
                chart = Vec::new();
            }
        }

        let cash_balance = finite_or_zero(resolve_cash_balance(&reported, holdings_value));
        let total_value = finite_or_zero(resolve_total_value(
            &reported,
            holdings_value,
            cash_balance,
        ));
        let net_trade_flow: f64 = events
            .iter()
            .map(|event| match event.action {
                TradeAction::Sell => event.quantity * event.unit_price,
                TradeAction::Buy => -(event.quantity * event.unit_price),
            })
            .sum();
        let initial_deposit =
            resolve_initial_deposit(&reported, cash_balance, total_cost, net_trade_flow);
        let total_unrealized_pnl = if total_value > 0.0 {
            finite_or_zero(total_value - initial_deposit)
        } else {
            0.0
        };
        let (day_change_value, day_change_percent) =
            resolve_day_change(&reported, &chart, initial_deposit);

        let transactions: Vec<TransactionRecord> = events
            .iter()
            .rev()
            .map(|event| TransactionRecord {
                id: event.id.clone(),
                instrument: event.instrument.clone(),
                action: event.action,
                quantity: event.quantity,
                unit_price: event.unit_price,
                timestamp: event.timestamp.unwrap_or(now),
                raw_timestamp: event.raw_timestamp.clone(),
            })
            .collect();

        PortfolioSnapshot {
            holdings,
            cash_balance,
            total_value,
            total_cost: finite_or_zero(total_cost),
            total_unrealized_pnl,
            initial_deposit: finite_or_zero(initial_deposit),
            day_change_value: finite_or_zero(day_change_value),
            day_change_percent: finite_or_zero(day_change_percent),
            chart_points: chart,
            transactions,
        }
    }
}

/// Last line of the no-throw contract: every emitted number is finite.
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
