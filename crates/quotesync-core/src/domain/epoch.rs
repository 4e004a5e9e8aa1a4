//! Lenient epoch-second normalization for the upstream `timestamp` field.

use serde_json::Value;
use time::OffsetDateTime;

/// Interpret an arbitrary JSON value as UTC epoch seconds.
///
/// Integers, integral floats, and numeric strings are accepted. Anything
/// else (absent, null, booleans, non-numeric strings, out-of-range seconds)
/// yields `None` rather than an error; callers substitute the fetch time
/// for `None`.
pub fn normalize(value: &Value) -> Option<OffsetDateTime> {
    let seconds = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(integral_seconds))?,
        Value::String(text) => text.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    OffsetDateTime::from_unix_timestamp(seconds).ok()
}

fn integral_seconds(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value <= i64::MAX as f64;
    if value.is_finite() && value.fract() == 0.0 && in_range {
        Some(value as i64)
    } else {
        None
    }
}
