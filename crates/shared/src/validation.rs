//! Common validation utilities.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{TimeZone, Utc};
use validator::ValidationError;

/// Maximum age of a drone position fix in minutes.
const MAX_FIX_AGE_MINUTES: i64 = 10;

/// Maximum allowed future timestamp tolerance in seconds (clock skew).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 300;

/// Upper bound for decoded finding images (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that accuracy is non-negative.
pub fn validate_accuracy(accuracy: f64) -> Result<(), ValidationError> {
    if accuracy >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("accuracy_range");
        err.message = Some("Accuracy must be non-negative".into());
        Err(err)
    }
}

/// Validates that a string contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a position fix timestamp in milliseconds since epoch.
///
/// Drone fixes older than ten minutes are stale; anything more than five
/// minutes ahead of the server clock is rejected.
pub fn validate_fix_timestamp(timestamp_millis: i64) -> Result<(), ValidationError> {
    let now = Utc::now();

    let timestamp = match Utc.timestamp_millis_opt(timestamp_millis).single() {
        Some(ts) => ts,
        None => {
            let mut err = ValidationError::new("timestamp_invalid");
            err.message = Some("Invalid timestamp format".into());
            return Err(err);
        }
    };

    if timestamp > now + chrono::Duration::seconds(MAX_FUTURE_TOLERANCE_SECS) {
        let mut err = ValidationError::new("timestamp_future");
        err.message = Some("Timestamp cannot be in the future".into());
        return Err(err);
    }

    if timestamp < now - chrono::Duration::minutes(MAX_FIX_AGE_MINUTES) {
        let mut err = ValidationError::new("timestamp_stale");
        err.message = Some("Position fix is older than 10 minutes".into());
        return Err(err);
    }

    Ok(())
}

/// Decodes a base64 image payload and checks its size.
///
/// Accepts an optional `data:<mime>;base64,` prefix as produced by browsers.
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, ValidationError> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:image/") => data,
        Some(_) => {
            let mut err = ValidationError::new("image_mime");
            err.message = Some("Image payload must be an image data URL".into());
            return Err(err);
        }
        None => payload,
    };

    let bytes = STANDARD.decode(encoded.trim()).map_err(|_| {
        let mut err = ValidationError::new("image_encoding");
        err.message = Some("Image payload must be valid base64".into());
        err
    })?;

    if bytes.is_empty() {
        let mut err = ValidationError::new("image_empty");
        err.message = Some("Image payload is empty".into());
        return Err(err);
    }

    if bytes.len() > MAX_IMAGE_BYTES {
        let mut err = ValidationError::new("image_size");
        err.message = Some("Image must be at most 5 MiB".into());
        return Err(err);
    }

    Ok(bytes)
}

/// `validator` adapter for [`decode_image_payload`].
pub fn validate_image_payload(payload: &str) -> Result<(), ValidationError> {
    decode_image_payload(payload).map(|_| ())
}
