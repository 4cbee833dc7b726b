//! Shared Cache Module
//!
//! Thread-safe handle for hosts that use one cache from several threads.
//! A single lock spans each whole operation, eviction cascade and listener
//! dispatch included.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cache::{ByteSize, CacheEntry, CacheStats, EvictionReason, ListenerId, LruCache, Metadata};
use crate::config::CacheConfig;

// == Shared Cache ==
/// Cloneable, lock-protected `LruCache`.
///
/// Lookups return owned clones since references cannot outlive the lock.
/// Borrowing views (`iter`, `keys`, `config`) are reachable through
/// [`SharedCache::with`].
pub struct SharedCache<K, V> {
    inner: Arc<Mutex<LruCache<K, V>>>,
}

impl<K, V> Clone for SharedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> SharedCache<K, V>
where
    K: Hash + Eq + Clone + ByteSize,
    V: ByteSize,
{
    /// Creates a new shared cache with the given limits.
    pub fn new(config: CacheConfig) -> Self {
        Self::from_cache(LruCache::new(config))
    }

    /// Wraps an existing cache.
    pub fn from_cache(cache: LruCache<K, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Runs `f` with exclusive access to the cache.
    pub fn with<R>(&self, f: impl FnOnce(&mut LruCache<K, V>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn set(&self, key: K, value: V) {
        self.lock().set(key, value);
    }

    pub fn set_with_meta(&self, key: K, value: V, metadata: Metadata) {
        self.lock().set_with_meta(key, value, metadata);
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.lock().get(key).cloned()
    }

    pub fn get_meta<Q>(&self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.lock().get_meta(key).cloned()
    }

    /// Non-promoting read; see [`LruCache::peek`].
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.lock().peek(key).cloned()
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().has(key)
    }

    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().delete(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn purge_expired(&self) -> usize {
        self.lock().purge_expired()
    }

    /// Registers an eviction listener. It runs while the lock is held and
    /// receives the locked cache, so it must not touch this handle.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&mut LruCache<K, V>, &CacheEntry<K, V>, EvictionReason) + Send + 'static,
    {
        self.lock().subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.lock().unsubscribe(id);
    }

    pub fn clear_listeners(&self) {
        self.lock().clear_listeners();
    }

    pub fn stats(&self) -> CacheStats<K> {
        self.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A panicking listener poisons the lock. The engine restores its listener
    /// registry before the panic leaves it, so keep serving the cache.
    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
