use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, StoreError};

/// Encodes a symptom id as 8 big-endian bytes so that key order is id order.
pub fn encode_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn decode_id(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Decode(format!("id key must be 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

/// Formats an event timestamp as its storage key.
///
/// Always UTC with nine fractional digits, e.g. `2024-03-01T10:00:00.000000001Z`,
/// so every key has the same width and byte order matches time order.
pub fn event_key(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parses a storage key back into its timestamp.
///
/// Any RFC 3339 form is accepted, including second-resolution keys with a
/// local offset.
pub fn parse_event_key(key: &[u8]) -> Result<DateTime<Utc>> {
    let text = std::str::from_utf8(key)
        .map_err(|e| StoreError::Decode(format!("event key is not utf-8: {}", e)))?;
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("event key {:?} is not a timestamp: {}", text, e)))
}
