//! Helpers for reading fields out of inbound gateway payloads.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{CacheError, Result};

/// Raw inbound payload, forwarded verbatim to entity patch operations.
pub type Payload = Map<String, Value>;

/// Discord epoch (2015-01-01T00:00:00Z) in milliseconds.
const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Read a snowflake that may arrive as a string or an integer.
pub fn snowflake(data: &Payload, kind: &'static str, key: &'static str) -> Result<Option<String>> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Ok(Some(n.to_string())),
        Some(other) => Err(invalid(kind, key, other)),
    }
}

/// Like [`snowflake`], but the field must be present.
pub fn require_snowflake(data: &Payload, kind: &'static str, key: &'static str) -> Result<String> {
    snowflake(data, kind, key)?.ok_or(CacheError::missing(kind, key))
}

/// The `id` field of a payload.
pub fn require_id(data: &Payload, kind: &'static str) -> Result<String> {
    require_snowflake(data, kind, "id")
}

/// Deserialize an optional field. `None` means the key is absent.
///
/// A JSON `null` is handed to `T`, so `field::<Option<String>>` can tell
/// "cleared" from "not sent".
pub fn field<T: DeserializeOwned>(
    data: &Payload,
    kind: &'static str,
    key: &'static str,
) -> Result<Option<T>> {
    data.get(key)
        .map(|value| {
            T::deserialize(value).map_err(|source| CacheError::InvalidField {
                kind,
                field: key,
                source,
            })
        })
        .transpose()
}

/// Deserialize a field that must be present and non-null.
pub fn require<T: DeserializeOwned>(data: &Payload, kind: &'static str, key: &'static str) -> Result<T> {
    match data.get(key) {
        None | Some(Value::Null) => Err(CacheError::missing(kind, key)),
        Some(_) => field(data, kind, key)?.ok_or(CacheError::missing(kind, key)),
    }
}

/// A boolean flag where `null` reads as `false`.
pub fn flag(data: &Payload, kind: &'static str, key: &'static str) -> Result<Option<bool>> {
    let value: Option<Option<bool>> = field(data, kind, key)?;
    Ok(value.map(Option::unwrap_or_default))
}

/// A nested object field, such as the `user` inside a member payload.
pub fn object<'a>(data: &'a Payload, kind: &'static str, key: &'static str) -> Result<Option<&'a Payload>> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(invalid(kind, key, other)),
    }
}

/// Whether the payload carries nothing but its identifier.
pub fn is_bare_id(data: &Payload) -> bool {
    data.len() == 1 && data.contains_key("id")
}

/// Creation time encoded in a snowflake id.
pub fn snowflake_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let raw: u64 = id.parse().ok()?;
    let ms = i64::try_from(raw >> 22).ok()? + SNOWFLAKE_EPOCH_MS;
    Utc.timestamp_millis_opt(ms).single()
}

fn invalid(kind: &'static str, key: &'static str, value: &Value) -> CacheError {
    CacheError::InvalidField {
        kind,
        field: key,
        source: <serde_json::Error as serde::de::Error>::custom(format!(
            "expected a snowflake, got {value}"
        )),
    }
}

/// Build a [`Payload`] from a `json!` literal.
#[cfg(test)]
pub fn from_json(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture is not an object: {other}"),
    }
}
