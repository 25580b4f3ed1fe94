//! Extended-JSON value helpers.
//!
//! Identifiers, dates and binary payloads are carried as single-key
//! wrapper objects (`{"$oid": ..}`, `{"$date": ..}`, `{"$binary": ..}`).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value, json};

/// Recognised extended-JSON wrapper kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtKind {
    ObjectId,
    Date,
    Binary,
}

/// Detect a single-key extended-JSON wrapper.
pub fn wrapper_kind(map: &Map<String, Value>) -> Option<ExtKind> {
    if map.len() != 1 {
        return None;
    }
    match map.keys().next().map(String::as_str) {
        Some("$oid") => Some(ExtKind::ObjectId),
        Some("$date") => Some(ExtKind::Date),
        Some("$binary") => Some(ExtKind::Binary),
        _ => None,
    }
}

/// Build an object id value from its 24-character hex form.
pub fn object_id(hex_str: &str) -> Result<Value, hex::FromHexError> {
    let bytes = hex::decode(hex_str)?;
    if bytes.len() != 12 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(json!({ "$oid": hex::encode(bytes) }))
}

/// Build a date value.
pub fn date(at: DateTime<Utc>) -> Value {
    json!({ "$date": at.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

/// Build a date value from milliseconds since the epoch.
pub fn date_from_millis(millis: i64) -> Value {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(at) => date(at),
        None => json!({ "$date": { "$numberLong": millis.to_string() } }),
    }
}

/// Build a generic binary value.
pub fn binary(bytes: &[u8]) -> Value {
    json!({ "$binary": { "base64": BASE64.encode(bytes), "subType": "00" } })
}

/// Milliseconds since the epoch for a `$date` wrapper.
///
/// Accepts the relaxed (RFC 3339 string) and canonical (`$numberLong`) forms.
pub fn date_millis(map: &Map<String, Value>) -> Option<i64> {
    match map.get("$date")? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.timestamp_millis()),
        Value::Number(n) => n.as_i64(),
        Value::Object(inner) => inner.get("$numberLong")?.as_str()?.parse().ok(),
        _ => None,
    }
}
