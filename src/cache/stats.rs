//! Cache Statistics Module
//!
//! Point-in-time snapshot of occupancy, fullness, hottest keys and lifetime
//! counters (hits, misses, evictions by reason).

use serde::Serialize;

use crate::cache::EvictionReason;

// == Eviction Counts ==
/// Evictions broken down by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionCounts {
    pub count: u64,
    pub bytes: u64,
    pub age: u64,
}

impl EvictionCounts {
    /// Increments the counter for `reason`.
    pub fn record(&mut self, reason: EvictionReason) {
        match reason {
            EvictionReason::Count => self.count += 1,
            EvictionReason::Bytes => self.bytes += 1,
            EvictionReason::Age => self.age += 1,
        }
    }

    /// Evictions for every reason combined.
    pub fn total(&self) -> u64 {
        self.count + self.bytes + self.age
    }
}

// == Cache Stats ==
/// Snapshot returned by `LruCache::stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats<K> {
    /// Resident entries, expired-but-untouched ones included
    pub count: usize,
    /// Summed byte size of resident entries
    pub total_bytes: usize,
    /// Percentage of the tightest configured limit in use
    pub fullness: u64,
    /// Most recently used keys, hottest first
    pub hot_keys: Vec<K>,
    /// Lookups that returned a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    pub evictions: EvictionCounts,
}

impl<K> CacheStats<K> {
    // == Full ==
    /// Fullness rendered as a percentage string, e.g. `"42%"`.
    pub fn full(&self) -> String {
        format!("{}%", self.fullness)
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Fullness ==
/// `floor(max(count / max_items, bytes / max_bytes) * 100)`.
///
/// An unconfigured (zero) limit contributes nothing.
pub fn fullness(count: usize, max_items: usize, bytes: usize, max_bytes: usize) -> u64 {
    let ratio = |used: usize, limit: usize| -> u64 {
        if limit == 0 {
            0
        } else {
            (used as u128 * 100 / limit as u128) as u64
        }
    };
    ratio(count, max_items).max(ratio(bytes, max_bytes))
}
