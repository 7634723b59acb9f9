//! Tolerant numeric coercion for unreliable upstream feeds.
//!
//! Upstream numeric fields arrive as JSON numbers, as strings with currency
//! symbols and thousands separators, or not at all. Everything funnels
//! through these helpers so a malformed field degrades to a neutral value
//! instead of poisoning the snapshot.

use serde_json::Value;

/// Coerce a raw JSON value to a finite `f64`, returning `fallback` for
/// anything that does not parse.
pub fn coerce_f64(value: &Value, fallback: f64) -> f64 {
    coerce_opt_f64(value).unwrap_or(fallback)
}

/// Like [`coerce_f64`] but preserves "no usable value" as `None`.
///
/// Accepts JSON numbers and numeric strings, stripping `$`, `,` and
/// whitespace. Non-finite results count as missing.
pub fn coerce_opt_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Render a raw JSON value as a display string, if it carries one.
///
/// Used for ids and original timestamp strings, where the upstream type
/// wobbles between strings and numbers.
pub fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
