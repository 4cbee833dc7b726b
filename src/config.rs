//! Configuration Module
//!
//! Handles loading and managing cache limits from environment variables or a
//! JSON document.

use std::env;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CacheError, Result};

/// Largest `max_age` (in seconds) that can be represented as a time delta.
pub const MAX_AGE_LIMIT: u64 = (i64::MAX / 1000) as u64;

/// Cache limits.
///
/// Every limit uses zero to mean "unlimited" (or "disabled" for `max_age`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    #[serde(alias = "max_items")]
    pub max_items: usize,
    /// Maximum summed byte size of all entries
    #[serde(alias = "max_bytes")]
    pub max_bytes: usize,
    /// Seconds after each set until an entry lazily expires
    #[serde(alias = "max_age")]
    pub max_age: u64,
}

impl CacheConfig {
    /// Creates an unbounded configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of resident entries.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Caps the summed byte size of resident entries.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the per-entry age limit in seconds.
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ITEMS` - Maximum entry count (default: 0, unlimited)
    /// - `CACHE_MAX_BYTES` - Maximum total bytes (default: 0, unlimited)
    /// - `CACHE_MAX_AGE` - Entry age limit in seconds (default: 0, disabled)
    ///
    /// Unparsable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self {
            max_items: parse_var(&lookup, "CACHE_MAX_ITEMS"),
            max_bytes: parse_var(&lookup, "CACHE_MAX_BYTES"),
            max_age: parse_var(&lookup, "CACHE_MAX_AGE"),
        };

        if let Err(err) = config.validate() {
            warn!("{}; age limit disabled", err);
            return config.with_max_age(0);
        }
        config
    }

    /// Parses a JSON object such as `{"maxItems": 100, "maxAge": 60}`.
    ///
    /// Missing keys keep their defaults. Unrecognized keys are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every limit is representable.
    pub fn validate(&self) -> Result<()> {
        if self.max_age > MAX_AGE_LIMIT {
            return Err(CacheError::InvalidConfig(format!(
                "maxAge {} exceeds the limit of {} seconds",
                self.max_age, MAX_AGE_LIMIT
            )));
        }
        Ok(())
    }

    /// Returns the age limit as a time delta, or None when disabled.
    pub fn max_age_delta(&self) -> Option<TimeDelta> {
        if self.max_age == 0 {
            return None;
        }
        i64::try_from(self.max_age)
            .ok()
            .and_then(TimeDelta::try_seconds)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> T
where
    T: std::str::FromStr + Default,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value {:?} for {}", raw, name);
            T::default()
        }),
        None => T::default(),
    }
}
