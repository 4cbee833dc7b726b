//! Eviction Events Module
//!
//! Typed observer list notified whenever the eviction policy removes an entry.

use std::fmt;

use serde::Serialize;

use crate::cache::{CacheEntry, LruCache};

// == Eviction Reason ==
/// Why an entry was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionReason {
    /// The entry count exceeded `max_items`
    Count,
    /// The summed byte size exceeded `max_bytes`
    Bytes,
    /// The entry was past its expiry when looked up
    Age,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Count => "count",
            EvictionReason::Bytes => "bytes",
            EvictionReason::Age => "age",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a subscribed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Callback invoked for every evicted entry.
///
/// The cache is handed back so the listener may call into it; the evicted
/// entry has already been unlinked.
pub type EvictionListener<K, V> =
    Box<dyn FnMut(&mut LruCache<K, V>, &CacheEntry<K, V>, EvictionReason) + Send>;

// == Listeners ==
/// Registered listeners plus removals requested while they were dispatching.
pub(crate) struct Listeners<K, V> {
    entries: Vec<(ListenerId, EvictionListener<K, V>)>,
    cancelled: Vec<ListenerId>,
    cleared: bool,
}

impl<K, V> Default for Listeners<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cancelled: Vec::new(),
            cleared: false,
        }
    }
}

impl<K, V> Listeners<K, V> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&mut self, id: ListenerId, listener: EvictionListener<K, V>) {
        self.entries.push((id, listener));
    }

    /// Removes a listener, returning whether it was registered here.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    /// Records a removal for a listener that is checked out for dispatch.
    pub fn cancel(&mut self, id: ListenerId) {
        self.cancelled.push(id);
    }

    /// Drops every listener here and every listener checked out for dispatch.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
        self.cancelled.clear();
        self.cleared = true;
    }

    /// Whether `id` must not be called again.
    pub fn is_cancelled(&self, id: ListenerId) -> bool {
        self.cleared || self.cancelled.contains(&id)
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut (ListenerId, EvictionListener<K, V>)> {
        self.entries.iter_mut()
    }

    /// Folds changes recorded in `during` (the stand-in list that was live
    /// while `self` was dispatching) back into `self`.
    pub fn merge(&mut self, during: Listeners<K, V>) {
        if during.cleared {
            self.entries.clear();
        }
        self.entries
            .retain(|(id, _)| !during.cancelled.contains(id));
        self.entries.extend(during.entries);
        self.cancelled.clear();
        self.cleared = false;
    }
}

impl<K, V> fmt::Debug for Listeners<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
