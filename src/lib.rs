pub mod clock;
pub mod coerce;
pub mod feeds;
pub mod instant;
pub mod prices;
pub mod snapshot;
pub mod timeline;
pub mod trades;

pub use clock::{Clock, FixedClock, SystemClock};
pub use feeds::{
    FeedError, RawHistoryPoint, RawPosition, RawPriceObservation, RawTrade, ReportedAccountState,
    SnapshotInputs,
};
pub use prices::{PriceCursor, PricePoint, PriceSeriesIndex};
pub use snapshot::{HoldingPosition, PortfolioSnapshot, SnapshotCalculator, TransactionRecord};
pub use timeline::TimelinePoint;
pub use trades::{TradeAction, TradeBook, TradeEvent};
