//! Recency List Module
//!
//! Arena-backed doubly linked list that owns every cache entry and keeps them
//! in access order.

use std::iter::FusedIterator;

use crate::cache::CacheEntry;

// == Handle ==
/// Stable position of an entry in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug)]
struct Node<K, V> {
    entry: CacheEntry<K, V>,
    /// More recently used neighbour
    prev: Option<Handle>,
    /// Less recently used neighbour
    next: Option<Handle>,
}

// == Recency List ==
/// Orders entries by access time:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Every operation is O(1). Freed slots are recycled.
#[derive(Debug)]
pub struct RecencyList<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<Handle>,
    tail: Option<Handle>,
    len: usize,
}

impl<K, V> Default for RecencyList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RecencyList<K, V> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Returns the number of linked entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently used entry.
    pub fn head(&self) -> Option<Handle> {
        self.head
    }

    /// Least recently used entry.
    pub fn tail(&self) -> Option<Handle> {
        self.tail
    }

    // == Push Front ==
    /// Stores a new entry and links it as the head.
    pub fn push_front(&mut self, entry: CacheEntry<K, V>) -> Handle {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        let handle = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                Handle(index)
            }
            None => {
                self.slots.push(Some(node));
                Handle(self.slots.len() - 1)
            }
        };
        self.len += 1;
        self.link_front(handle);
        handle
    }

    // == Promote ==
    /// Moves an entry to the head. No-op if it is already there.
    pub fn promote(&mut self, handle: Handle) {
        if self.head == Some(handle) {
            return;
        }
        self.unlink(handle);
        self.link_front(handle);
    }

    // == Remove ==
    /// Unlinks an entry and hands it back.
    ///
    /// # Panics
    /// Panics if `handle` does not refer to a live entry.
    pub fn remove(&mut self, handle: Handle) -> CacheEntry<K, V> {
        self.unlink(handle);
        let node = self.slots[handle.0]
            .take()
            .expect("handle refers to a live entry");
        self.free.push(handle.0);
        self.len -= 1;
        node.entry
    }

    pub fn entry(&self, handle: Handle) -> &CacheEntry<K, V> {
        &self.node(handle).entry
    }

    pub fn entry_mut(&mut self, handle: Handle) -> &mut CacheEntry<K, V> {
        &mut self.node_mut(handle).entry
    }

    /// Handle of the next less recently used entry.
    pub fn next(&self, handle: Handle) -> Option<Handle> {
        self.node(handle).next
    }

    /// Handle of the next more recently used entry.
    pub fn prev(&self, handle: Handle) -> Option<Handle> {
        self.node(handle).prev
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Walks entries from head to tail (or back, via `rev`).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    fn node(&self, handle: Handle) -> &Node<K, V> {
        self.slots[handle.0]
            .as_ref()
            .expect("handle refers to a live entry")
    }

    fn node_mut(&mut self, handle: Handle) -> &mut Node<K, V> {
        self.slots[handle.0]
            .as_mut()
            .expect("handle refers to a live entry")
    }

    /// Patches the neighbours (and head/tail) around `handle`.
    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = {
            let node = self.node(handle);
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(handle);
        node.prev = None;
        node.next = None;
    }

    /// Installs a detached node as the new head.
    fn link_front(&mut self, handle: Handle) {
        let old_head = self.head;
        {
            let node = self.node_mut(handle);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(old_head) => self.node_mut(old_head).prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
    }
}

// == Iterator ==
/// Recency-ordered iterator over entries. Does not promote.
pub struct Iter<'a, K, V> {
    list: &'a RecencyList<K, V>,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a CacheEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front?;
        self.front = self.list.next(handle);
        self.remaining -= 1;
        Some(self.list.entry(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.back?;
        self.back = self.list.prev(handle);
        self.remaining -= 1;
        Some(self.list.entry(handle))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
