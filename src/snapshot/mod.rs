mod calculator;
mod models;
mod precedence;

pub use calculator::SnapshotCalculator;
pub use models::{HoldingPosition, PortfolioSnapshot, TransactionRecord};
pub use precedence::DEFAULT_INITIAL_DEPOSIT;
