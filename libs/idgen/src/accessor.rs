//! Reading the prefix and timestamp back out of an id.
//!
//! Ids have the form `{prefix}_{ulid}`. The prefix and separator are
//! optional for the time-based accessors, so a bare ULID decodes as well.

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::error::{IdError, Result};
use crate::SEPARATOR;

/// Returns the prefix of an id, i.e. everything before the first `_`.
///
/// Returns an empty string if the id has no separator.
#[must_use]
pub fn extract_prefix(id: &str) -> &str {
    id.split_once(SEPARATOR).map_or("", |(prefix, _)| prefix)
}

/// Returns the Unix time in milliseconds encoded in the id.
///
/// # Errors
///
/// Returns [`IdError::Malformed`] if the payload is not a valid ULID.
pub fn extract_time(id: &str) -> Result<u64> {
    extract_ulid(id).map(|ulid| ulid.timestamp_ms())
}

/// Returns the time encoded in the id as a UTC datetime.
///
/// # Errors
///
/// Returns [`IdError::Malformed`] if the payload is not a valid ULID.
pub fn extract_datetime(id: &str) -> Result<DateTime<Utc>> {
    let ms = i64::try_from(extract_time(id)?).map_err(|_| IdError::Malformed)?;
    DateTime::from_timestamp_millis(ms).ok_or(IdError::Malformed)
}

/// Decodes the ULID payload of an id.
///
/// # Errors
///
/// Returns [`IdError::Malformed`] on a wrong length, a character outside
/// the Crockford alphabet, or a value wider than 128 bits.
pub fn extract_ulid(id: &str) -> Result<Ulid> {
    let payload = id.split_once(SEPARATOR).map_or(id, |(_, payload)| payload);

    // 26 base32 digits hold 130 bits; the leading digit may only use three.
    if !payload.starts_with(|c: char| ('0'..='7').contains(&c)) {
        return Err(IdError::Malformed);
    }

    Ulid::from_string(payload).map_err(|_| IdError::Malformed)
}
