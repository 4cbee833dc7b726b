//! Cache Store Module
//!
//! Main cache engine combining a HashMap index with the recency list, the
//! count/byte/age eviction policies and eviction notifications.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::TimeDelta;
use tracing::{debug, trace, warn};

use crate::cache::entry::{explicit_length, take_expires_at};
use crate::cache::events::Listeners;
use crate::cache::lru::{Handle, RecencyList};
use crate::cache::stats::{fullness, EvictionCounts};
use crate::cache::{
    ByteSize, CacheEntry, CacheStats, Clock, EvictionReason, ListenerId, Metadata, SystemClock,
    HOT_KEYS_LIMIT,
};
use crate::config::CacheConfig;

// == LRU Cache ==
/// Size-bounded LRU cache with lazy age expiry.
///
/// Every byte weight includes the key's own weight (2 bytes per UTF-16 code
/// unit for text keys) on top of the value's.
pub struct LruCache<K, V> {
    /// Key to list position
    index: HashMap<K, Handle>,
    /// Owns the entries, most recently used first
    list: RecencyList<K, V>,
    /// Sum of `byte_size` over resident entries
    total_bytes: usize,
    config: CacheConfig,
    max_age: Option<TimeDelta>,
    clock: Arc<dyn Clock>,
    hits: u64,
    misses: u64,
    evictions: EvictionCounts,
    listeners: Listeners<K, V>,
    next_listener_id: u64,
    /// Evicted entries waiting to be announced
    pending: VecDeque<(CacheEntry<K, V>, EvictionReason)>,
    dispatching: bool,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone + ByteSize,
    V: ByteSize,
{
    // == Constructor ==
    /// Creates a new cache with the given limits, using the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new cache that reads time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        if let Err(err) = config.validate() {
            warn!("{}; entries will not age out", err);
        }
        debug!(
            max_items = config.max_items,
            max_bytes = config.max_bytes,
            max_age = config.max_age,
            "Cache created"
        );

        Self {
            index: HashMap::new(),
            list: RecencyList::new(),
            total_bytes: 0,
            max_age: config.max_age_delta(),
            config,
            clock,
            hits: 0,
            misses: 0,
            evictions: EvictionCounts::default(),
            listeners: Listeners::default(),
            next_listener_id: 0,
            pending: VecDeque::new(),
            dispatching: false,
        }
    }

    // == Set ==
    /// Stores a value, replacing any previous one for the key.
    pub fn set(&mut self, key: K, value: V) {
        self.set_with_meta(key, value, Metadata::new());
    }

    /// Stores a value together with caller metadata.
    ///
    /// The entry moves to the head of the recency list. On replace, the
    /// supplied metadata fields are merged over the existing ones.
    ///
    /// Two metadata fields are interpreted:
    /// - `length`: explicit value size in bytes, used instead of the value's
    ///   own weight for this set
    /// - `expiresAt`: custom expiry (Unix seconds or RFC 3339), taking
    ///   precedence over `max_age`; it is moved into `expires_at`
    ///
    /// Afterwards the count and byte limits are enforced, which may evict the
    /// entry that was just stored if it alone exceeds `max_bytes`.
    pub fn set_with_meta(&mut self, key: K, value: V, mut metadata: Metadata) {
        let now = self.clock.now();
        let custom_expiry = take_expires_at(&mut metadata);
        let expires_at =
            custom_expiry.or_else(|| self.max_age.and_then(|age| now.checked_add_signed(age)));
        let byte_size = explicit_length(&metadata)
            .unwrap_or_else(|| value.byte_size())
            .saturating_add(key.byte_size());

        if let Some(&handle) = self.index.get(&key) {
            let entry = self.list.entry_mut(handle);
            let previous = std::mem::replace(&mut entry.byte_size, byte_size);
            entry.value = value;
            entry.metadata.extend(metadata);
            if expires_at.is_some() {
                entry.expires_at = expires_at;
            }
            self.total_bytes = self
                .total_bytes
                .saturating_sub(previous)
                .saturating_add(byte_size);
            self.list.promote(handle);
            trace!(byte_size, previous, "Replaced cache entry");
        } else {
            let entry = CacheEntry::new(key.clone(), value, byte_size, metadata, expires_at);
            let handle = self.list.push_front(entry);
            self.index.insert(key, handle);
            self.total_bytes = self.total_bytes.saturating_add(byte_size);
            trace!(byte_size, "Inserted cache entry");
        }

        self.enforce_limits();
        self.dispatch_pending();
    }

    // == Get ==
    /// Retrieves a value by key and marks it most recently used.
    ///
    /// An expired entry is evicted (reason `Age`) and reported as absent.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.lookup(key)?;
        Some(&self.list.entry(handle).value)
    }

    /// Same as `get`, but returns the whole entry envelope.
    pub fn get_meta<Q>(&mut self, key: &Q) -> Option<&CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.lookup(key)?;
        Some(self.list.entry(handle))
    }

    // == Peek ==
    /// Reads a live value without promoting it or touching statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.live(key).map(|entry| &entry.value)
    }

    // == Has ==
    /// Reports whether a live entry exists, without altering recency order.
    ///
    /// Unlike `get`, an expired entry is reported absent but left in place.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.live(key).is_some()
    }

    // == Delete ==
    /// Removes an entry by key. Listeners are not notified.
    ///
    /// Returns whether the key was present.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&handle) = self.index.get(key) else {
            return false;
        };
        self.unlink(handle);
        true
    }

    // == Clear ==
    /// Drops every entry. Listeners are not notified; counters are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.list.clear();
        self.total_bytes = 0;
        debug!("Cache cleared");
    }

    // == Purge Expired ==
    /// Evicts every expired entry, least recently used first.
    ///
    /// Each one is announced with reason `Age`. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let mut cursor = self.list.tail();
        let mut purged = 0;

        while let Some(handle) = cursor {
            cursor = self.list.prev(handle);
            if self.list.entry(handle).is_expired_at(now) {
                self.evict(handle, EvictionReason::Age);
                purged += 1;
            }
        }

        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        self.dispatch_pending();
        purged
    }

    // == Listeners ==
    /// Registers a listener called for every evicted entry.
    ///
    /// Listeners run synchronously inside the call that caused the eviction
    /// and may call back into the cache. Evictions triggered from inside a
    /// listener are announced once the current listener returns.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&mut LruCache<K, V>, &CacheEntry<K, V>, EvictionReason) + Send + 'static,
    {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push(id, Box::new(listener));
        id
    }

    /// Removes a listener. Safe to call from inside a listener.
    pub fn unsubscribe(&mut self, id: ListenerId) {
        if !self.listeners.remove(id) && self.dispatching {
            self.listeners.cancel(id);
        }
    }

    /// Removes every listener. Safe to call from inside a listener.
    pub fn clear_listeners(&mut self) {
        if self.dispatching {
            self.listeners.cancel_all();
        } else {
            self.listeners = Listeners::default();
        }
    }

    // == Stats ==
    /// Returns a snapshot of the cache. Does not alter recency order.
    pub fn stats(&self) -> CacheStats<K> {
        CacheStats {
            count: self.len(),
            total_bytes: self.total_bytes,
            fullness: fullness(
                self.len(),
                self.config.max_items,
                self.total_bytes,
                self.config.max_bytes,
            ),
            hot_keys: self.keys().take(HOT_KEYS_LIMIT).cloned().collect(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    // == Length ==
    /// Returns the number of resident entries, expired-but-untouched included.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Summed byte size of resident entries.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Entries from most to least recently used. Does not promote.
    pub fn iter(&self) -> crate::cache::Iter<'_, K, V> {
        self.list.iter()
    }

    /// Keys from most to least recently used. Does not promote.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator {
        self.list.iter().map(|entry| &entry.key)
    }

    // == Internals ==
    /// Resolves a key for `get`/`get_meta`: counts the hit or miss, evicts
    /// expired entries and promotes live ones.
    fn lookup<Q>(&mut self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&handle) = self.index.get(key) else {
            self.misses += 1;
            return None;
        };

        if self.list.entry(handle).is_expired_at(self.clock.now()) {
            self.misses += 1;
            self.evict(handle, EvictionReason::Age);
            self.dispatch_pending();
            return None;
        }

        self.hits += 1;
        self.list.promote(handle);
        Some(handle)
    }

    fn live<Q>(&self, key: &Q) -> Option<&CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.list.entry(*self.index.get(key)?);
        if entry.is_expired_at(self.clock.now()) {
            None
        } else {
            Some(entry)
        }
    }

    /// Removes an entry from index, list and byte total.
    fn unlink(&mut self, handle: Handle) -> CacheEntry<K, V> {
        let entry = self.list.remove(handle);
        self.index.remove(&entry.key);
        self.total_bytes = self.total_bytes.saturating_sub(entry.byte_size);
        entry
    }

    fn evict(&mut self, handle: Handle, reason: EvictionReason) {
        let entry = self.unlink(handle);
        self.evictions.record(reason);
        debug!(
            reason = %reason,
            byte_size = entry.byte_size,
            count = self.list.len(),
            total_bytes = self.total_bytes,
            "Evicted cache entry"
        );
        self.pending.push_back((entry, reason));
    }

    fn enforce_limits(&mut self) {
        let CacheConfig {
            max_items,
            max_bytes,
            ..
        } = self.config;

        if max_items > 0 {
            while self.list.len() > max_items {
                let Some(tail) = self.list.tail() else { break };
                self.evict(tail, EvictionReason::Count);
            }
        }
        if max_bytes > 0 {
            while self.total_bytes > max_bytes {
                let Some(tail) = self.list.tail() else { break };
                self.evict(tail, EvictionReason::Bytes);
            }
        }
    }

    /// Announces pending evictions in order.
    ///
    /// Listeners are checked out of `self` while they run so they can borrow
    /// the cache mutably; re-entrant calls find `dispatching` set and leave
    /// their evictions queued for this loop.
    ///
    /// A panicking listener is re-raised only after the registry is restored,
    /// so the cache keeps notifying once the caller recovers. Entries not yet
    /// announced stay in `pending` for the next dispatch.
    fn dispatch_pending(&mut self) {
        if self.dispatching {
            return;
        }
        if self.listeners.is_empty() {
            self.pending.clear();
            return;
        }

        self.dispatching = true;
        let mut listeners = std::mem::take(&mut self.listeners);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            while let Some((entry, reason)) = self.pending.pop_front() {
                for (id, listener) in listeners.iter_mut() {
                    if self.listeners.is_cancelled(*id) {
                        continue;
                    }
                    listener(self, &entry, reason);
                }
            }
        }));

        // Listeners go back and dispatch is re-armed even if one panicked.
        let during = std::mem::replace(&mut self.listeners, listeners);
        self.listeners.merge(during);
        self.dispatching = false;

        if let Err(payload) = outcome {
            warn!(
                pending = self.pending.len(),
                "Eviction listener panicked; remaining evictions stay queued"
            );
            panic::resume_unwind(payload);
        }
    }
}

impl<K, V> Default for LruCache<K, V>
where
    K: Hash + Eq + Clone + ByteSize,
    V: ByteSize,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.list.len())
            .field("total_bytes", &self.total_bytes)
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
