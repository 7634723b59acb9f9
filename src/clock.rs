use chrono::{DateTime, TimeZone, Utc};

/// Abstraction over "current time" so snapshot reconstruction is
/// deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Midnight UTC on the given day. Most tests only care about the date.
    pub fn at(year: i32, month: u32, day: u32) -> Self {
        Self {
            now: Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
