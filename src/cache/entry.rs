//! Cache Entry Module
//!
//! Defines the envelope stored for every key: value, byte weight, caller
//! metadata and optional expiry.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value};

/// Open map of caller-supplied fields attached to an entry.
pub type Metadata = Map<String, Value>;

/// Metadata field holding an explicit value size in bytes.
pub const LENGTH_FIELD: &str = "length";

/// Metadata field holding a custom absolute expiry.
///
/// Accepts Unix seconds (integer or fractional) or an RFC 3339 string.
pub const EXPIRES_AT_FIELD: &str = "expiresAt";

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<K, V> {
    /// The entry key
    pub key: K,
    /// The stored value
    pub value: V,
    /// Weight charged against the byte budget, key overhead included
    pub byte_size: usize,
    /// Caller metadata merged across sets
    pub metadata: Metadata,
    /// Expiration instant, None = never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl<K, V> CacheEntry<K, V> {
    pub(crate) fn new(
        key: K,
        value: V,
        byte_size: usize,
        metadata: Metadata,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            key,
            value,
            byte_size,
            metadata,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its expiration instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    // == Time To Live ==
    /// Returns the time left before expiry, or None if no expiration is set.
    ///
    /// Returns a zero delta once the entry has expired.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.expires_at
            .map(|expires| (expires - now).max(TimeDelta::zero()))
    }
}

// == Metadata Helpers ==
/// Reads an explicit value size from metadata.
///
/// Any non-negative number is accepted; fractional lengths round up.
pub(crate) fn explicit_length(metadata: &Metadata) -> Option<usize> {
    let length = metadata.get(LENGTH_FIELD)?;
    if let Some(whole) = length.as_u64() {
        return usize::try_from(whole).ok();
    }
    length
        .as_f64()
        .filter(|length| length.is_finite() && *length >= 0.0)
        .map(|length| length.ceil() as usize)
}

/// Removes and parses a custom expiry from metadata.
///
/// Unparsable values are left in place and ignored.
pub(crate) fn take_expires_at(metadata: &mut Metadata) -> Option<DateTime<Utc>> {
    let parsed = metadata.get(EXPIRES_AT_FIELD).and_then(parse_instant)?;
    metadata.remove(EXPIRES_AT_FIELD);
    Some(parsed)
}

fn parse_instant(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(seconds) => {
            let seconds = seconds.as_f64()?;
            DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
        }
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|instant| instant.with_timezone(&Utc)),
        _ => None,
    }
}
