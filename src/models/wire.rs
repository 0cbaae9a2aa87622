//! Lenient decoders for backend records.
//!
//! The backend stores whatever the web form or the bot sent, so the same
//! field can arrive as a number, a numeric string, an empty string or null.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Free text that may arrive as a number. Blank text decodes as `None`.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// A price in whole currency units. Zero and blank both mean "not set".
pub fn lenient_price<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let amount = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("price is not numeric: {number}")))?,
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|err| D::Error::custom(format!("invalid price {trimmed:?}: {err}")))?
        }
        Some(other) => return Err(D::Error::custom(format!("invalid price: {other}"))),
    };

    if !amount.is_finite() || amount < 0.0 || amount > f64::from(u32::MAX) {
        return Err(D::Error::custom(format!("price out of range: {amount}")));
    }

    let rounded = amount.round() as u32;
    Ok((rounded > 0).then_some(rounded))
}

/// Optional value parsed from a string, where an empty string means absent.
pub fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(D::Error::custom),
    }
}

/// RFC 3339, RFC 2822 (what Flask emits) or epoch milliseconds. Anything
/// else decodes as `None` instead of rejecting the record.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(raw)) => parse_timestamp(&raw),
        Some(Value::Number(number)) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::{lenient_price, lenient_text, lenient_timestamp};

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_price")]
        price: Option<u32>,
        #[serde(default, deserialize_with = "lenient_text")]
        quantity: Option<String>,
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<chrono::DateTime<chrono::Utc>>,
    }

    fn decode(value: serde_json::Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn price_accepts_numbers_and_numeric_strings() {
        assert_eq!(decode(json!({ "price": 200 })).price, Some(200));
        assert_eq!(decode(json!({ "price": "300" })).price, Some(300));
        assert_eq!(decode(json!({ "price": "" })).price, None);
        assert_eq!(decode(json!({ "price": 0 })).price, None);
        assert_eq!(decode(json!({})).price, None);
    }

    #[test]
    fn price_rejects_garbage() {
        let result = serde_json::from_value::<Sample>(json!({ "price": "cheap" }));
        assert!(result.is_err());
    }

    #[test]
    fn quantity_may_be_a_number() {
        assert_eq!(decode(json!({ "quantity": 3 })).quantity.as_deref(), Some("3"));
        assert_eq!(decode(json!({ "quantity": "2 boxes" })).quantity.as_deref(), Some("2 boxes"));
        assert_eq!(decode(json!({ "quantity": " " })).quantity, None);
    }

    #[test]
    fn timestamp_accepts_http_date_and_rfc3339() {
        let http_date = decode(json!({ "timestamp": "Tue, 14 Oct 2025 10:00:00 GMT" }));
        let iso = decode(json!({ "timestamp": "2025-10-14T10:00:00Z" }));
        assert!(http_date.timestamp.is_some());
        assert_eq!(http_date.timestamp, iso.timestamp);
        assert!(decode(json!({ "timestamp": "yesterday" })).timestamp.is_none());
    }
}
