use serde::{Deserialize, Deserializer};
use serde_json::Value;
use time::OffsetDateTime;

use crate::domain::epoch;

/// Real-time quote payload as returned by the quote endpoint.
///
/// The upstream JSON is loosely typed: prices arrive as numbers or numeric
/// strings, and missing values are sometimes encoded as `"NA"`. A field that
/// cannot be read as a number deserializes to `None` instead of failing the
/// whole payload; provider-specific extras are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealTimeQuote {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub volume: Option<i64>,
    /// Raw source timestamp; see [`epoch::normalize`].
    #[serde(default)]
    pub timestamp: Value,
}

impl RealTimeQuote {
    /// True when the payload carries no usable field at all, the shape the
    /// upstream returns for an unknown ticker.
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
            && self.timestamp.is_null()
    }

    /// Source read time, when the payload carries a usable timestamp.
    pub fn read_at(&self) -> Option<OffsetDateTime> {
        epoch::normalize(&self.timestamp)
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(integral)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    })
}

fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value <= i64::MAX as f64;
    if value.is_finite() && value.fract() == 0.0 && in_range {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_typical_payload() {
        let quote: RealTimeQuote = serde_json::from_str(
            r#"{"code":"AAPL.US","open":187.2,"high":189.9,"low":186.4,
                "close":189.1,"volume":51234123,"timestamp":1700000000,
                "previousClose":186.0,"change":3.1}"#,
        )
        .expect("must parse");

        assert_eq!(quote.open, Some(187.2));
        assert_eq!(quote.close, Some(189.1));
        assert_eq!(quote.volume, Some(51_234_123));
        assert!(quote.read_at().is_some());
        assert!(!quote.is_empty());
    }

    #[test]
    fn numeric_strings_and_na_markers_are_tolerated() {
        let quote: RealTimeQuote = serde_json::from_str(
            r#"{"open":"187.2","high":"NA","low":null,"close":189.1,"volume":"51234123"}"#,
        )
        .expect("must parse");

        assert_eq!(quote.open, Some(187.2));
        assert_eq!(quote.high, None);
        assert_eq!(quote.low, None);
        assert_eq!(quote.volume, Some(51_234_123));
    }

    #[test]
    fn empty_object_is_empty_payload() {
        let quote: RealTimeQuote = serde_json::from_str("{}").expect("must parse");
        assert!(quote.is_empty());
        assert_eq!(quote.read_at(), None);
    }

    #[test]
    fn all_na_payload_is_empty() {
        let quote: RealTimeQuote = serde_json::from_str(
            r#"{"open":"NA","high":"NA","low":"NA","close":"NA","volume":"NA","timestamp":null}"#,
        )
        .expect("must parse");
        assert!(quote.is_empty());
    }

    #[test]
    fn malformed_timestamp_leaves_read_at_unset() {
        let quote: RealTimeQuote =
            serde_json::from_str(r#"{"close":189.1,"timestamp":"soon"}"#).expect("must parse");
        assert!(!quote.is_empty());
        assert_eq!(quote.read_at(), None);
    }
}
