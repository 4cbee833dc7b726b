//! Cache Module
//!
//! Provides in-process caching with LRU eviction bounded by entry count, byte
//! size and entry age.

mod clock;
mod entry;
mod events;
mod lru;
mod shared;
mod size;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, Metadata, EXPIRES_AT_FIELD, LENGTH_FIELD};
pub use events::{EvictionListener, EvictionReason, ListenerId};
pub use lru::Iter;
pub use shared::SharedCache;
pub use size::{text_size, ByteSize, BOOL_SIZE, CODE_UNIT_SIZE, NUMBER_SIZE};
pub use stats::{CacheStats, EvictionCounts};
pub use store::LruCache;

// == Public Constants ==
/// Number of most recently used keys reported by `stats()`
pub const HOT_KEYS_LIMIT: usize = 10;
