//! Raw upstream feed shapes.
//!
//! These mirror what the trade, position, price-history and account
//! collaborators actually emit, which is not much of a contract: numeric
//! fields may be numbers or formatted strings, timestamps come in several
//! shapes, and whole fields go missing. Every unreliable field is held as a
//! raw [`serde_json::Value`] and interpreted later through the coercion
//! layer, so deserializing a feed never fails on a bad record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::coerce::value_string;

/// Accept strings, numbers or null where a name-ish string is expected;
/// anything unusable becomes empty rather than a deserialization error.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_string(&value).unwrap_or_default())
}

/// One executed trade as reported by the ledger feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTrade {
    #[serde(alias = "tradeId", alias = "trade_id")]
    pub id: Value,
    #[serde(
        deserialize_with = "lenient_string",
        alias = "instrumentName",
        alias = "team_name",
        alias = "teamName"
    )]
    pub instrument_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub action: String,
    pub quantity: Value,
    pub price: Value,
    #[serde(alias = "averageBuyPrice", alias = "avg_price")]
    pub average_buy_price: Value,
    pub timestamp: Value,
}

/// A current position, used as an implicit buy when no trade ledger exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPosition {
    #[serde(
        deserialize_with = "lenient_string",
        alias = "instrumentName",
        alias = "team_name",
        alias = "teamName"
    )]
    pub instrument_name: String,
    pub quantity: Value,
    #[serde(alias = "averagePrice", alias = "avg_price")]
    pub average_price: Value,
    #[serde(alias = "averageBuyPrice")]
    pub average_buy_price: Value,
    #[serde(alias = "currentPrice")]
    pub current_price: Value,
    #[serde(alias = "positionValue")]
    pub position_value: Value,
    #[serde(alias = "costBasis")]
    pub cost_basis: Value,
    #[serde(alias = "unrealizedPnl")]
    pub unrealized_pnl: Value,
    #[serde(alias = "lastTransactionTimestamp", alias = "last_transaction_time")]
    pub last_transaction_timestamp: Value,
}

/// A single sparse price observation for one instrument.
///
/// The market table carries both `price` and `value`; `value` is the one the
/// serving side treats as authoritative when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPriceObservation {
    #[serde(
        deserialize_with = "lenient_string",
        alias = "instrumentName",
        alias = "team_name",
        alias = "teamName"
    )]
    pub instrument_name: String,
    pub price: Value,
    pub value: Value,
    pub timestamp: Value,
}

/// One point of the server-reported balance history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawHistoryPoint {
    pub timestamp: Value,
    pub balance: Value,
}

/// Whatever subset of account-level figures the server chose to report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportedAccountState {
    pub balance: Value,
    #[serde(alias = "cashBalance")]
    pub cash_balance: Value,
    #[serde(alias = "totalValue", alias = "total_account_value")]
    pub total_value: Value,
    #[serde(alias = "totalUnrealizedPnl")]
    pub total_unrealized_pnl: Value,
    #[serde(alias = "initialDeposit")]
    pub initial_deposit: Value,
    pub history: Vec<RawHistoryPoint>,
}

/// Everything the caller retrieved for one reconstruction pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotInputs {
    pub trades: Vec<RawTrade>,
    pub positions: Vec<RawPosition>,
    pub prices: Vec<RawPriceObservation>,
    pub reported: Option<ReportedAccountState>,
}

/// The one fallible boundary: a feed *container* that is not even the right
/// JSON shape (individual record fields never fail, they coerce).
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("malformed {feed} payload: {source}")]
    Malformed {
        feed: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotInputs {
    /// Build inputs from raw JSON payloads as retrieved off the wire.
    ///
    /// `null` payloads count as absent feeds.
    pub fn from_json_parts(
        trades: Value,
        positions: Value,
        prices: Value,
        reported: Option<Value>,
    ) -> Result<Self, FeedError> {
        Ok(Self {
            trades: parse_feed("trades", trades)?,
            positions: parse_feed("positions", positions)?,
            prices: parse_feed("prices", prices)?,
            reported: match reported {
                None | Some(Value::Null) => None,
                Some(value) => Some(
                    serde_json::from_value(value).map_err(|source| FeedError::Malformed {
                        feed: "reported account state",
                        source,
                    })?,
                ),
            },
        })
    }
}

fn parse_feed<T: serde::de::DeserializeOwned>(
    feed: &'static str,
    value: Value,
) -> Result<Vec<T>, FeedError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(|source| FeedError::Malformed { feed, source })
}
