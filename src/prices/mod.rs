mod day_change;
mod index;

pub use day_change::{day_change_percent, DAY_MS};
pub use index::{PriceCursor, PricePoint, PriceSeriesIndex};
