//! Hot Cache - An in-process key/value cache
//!
//! Keeps recently used items available in O(1) while bounding the cache by
//! entry count, summed byte size and entry age (expired lazily on lookup).
//!
//! ```
//! use hot_cache::{CacheConfig, LruCache};
//!
//! let mut cache = LruCache::new(CacheConfig::new().with_max_items(2));
//! cache.set("a".to_string(), "alpha".to_string());
//! cache.set("b".to_string(), "beta".to_string());
//! cache.get("a");
//! cache.set("c".to_string(), "gamma".to_string());
//!
//! assert!(!cache.has("b"));
//! assert_eq!(cache.stats().evictions.count, 1);
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    ByteSize, CacheEntry, CacheStats, Clock, EvictionReason, ListenerId, LruCache, ManualClock,
    Metadata, SharedCache, SystemClock,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
