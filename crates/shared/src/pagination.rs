//! Cursor-based pagination utilities.
//!
//! Feeds are ordered newest first by `(created_at, id)`; the cursor carries the
//! last row seen so the next page starts strictly after it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Hard upper bound on page size.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Error type for cursor operations.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Invalid cursor format")]
    InvalidFormat,
    #[error("Invalid cursor encoding")]
    InvalidEncoding,
    #[error("Invalid timestamp in cursor")]
    InvalidTimestamp,
    #[error("Invalid ID in cursor")]
    InvalidId,
}

/// Encodes a cursor as base64(RFC3339_timestamp:id).
pub fn encode_cursor(created_at: DateTime<Utc>, id: i64) -> String {
    let raw = format!(
        "{}:{}",
        created_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        id
    );
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// Decodes a cursor into `(timestamp, id)`.
pub fn decode_cursor(cursor: &str) -> Result<(DateTime<Utc>, i64), CursorError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CursorError::InvalidEncoding)?;

    let s = String::from_utf8(decoded).map_err(|_| CursorError::InvalidFormat)?;

    // The timestamp itself contains colons, so split on the last one.
    let colon_pos = s.rfind(':').ok_or(CursorError::InvalidFormat)?;
    let (timestamp_str, id_str) = (&s[..colon_pos], &s[colon_pos + 1..]);

    let id: i64 = id_str.parse().map_err(|_| CursorError::InvalidId)?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
        .map_err(|_| CursorError::InvalidTimestamp)?
        .with_timezone(&Utc);

    Ok((timestamp, id))
}

/// Clamps a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn clamp_page_size(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}
