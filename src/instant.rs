//! Tolerant timestamp resolution.
//!
//! Upstream timestamps arrive as RFC 3339 strings, naive `YYYY-MM-DD ...`
//! strings, epoch-millisecond numbers, or loosely-delimited numeric tuples
//! like `2025,11,3,14,30`. Parsing is total: anything unparseable resolves
//! to `None`, which orders before every valid instant and therefore acts as
//! the "unknown/earliest" sort sentinel.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("digit-run pattern compiles"))
}

/// Resolve a raw JSON value to an instant, or `None` when it cannot be
/// interpreted as one.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::String(s) => parse_instant_str(s),
        _ => None,
    }
}

/// String half of [`parse_instant`]: direct formats first, then the
/// numeric-tuple fallback.
pub fn parse_instant_str(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    parse_numeric_tuple(trimmed)
}

/// Interpret runs of digits positionally as
/// `(year, month, day, hour, minute, second)`. At least year/month/day are
/// required; out-of-range components fail the whole parse.
fn parse_numeric_tuple(raw: &str) -> Option<DateTime<Utc>> {
    let mut parts = [0u32; 6];
    let mut count = 0usize;
    for found in digit_runs().find_iter(raw).take(6) {
        parts[count] = found.as_str().parse().ok()?;
        count += 1;
    }
    if count < 3 {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(parts[0] as i32, parts[1], parts[2])?;
    let datetime = date.and_hms_opt(parts[3], parts[4], parts[5])?;
    Some(Utc.from_utc_datetime(&datetime))
}
