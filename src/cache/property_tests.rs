//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine against a plain recency-ordered model.

use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::cache::{EvictionReason, LruCache, Metadata};
use crate::config::CacheConfig;

// == Strategies ==
/// Small key space so that sets, gets and deletes collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-z]{0,12}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    GetMeta { key: String },
    Has { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::GetMeta { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Has { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Model ==
/// Reference behaviour: a deque ordered most recently used first.
#[derive(Debug, Default)]
struct Model {
    entries: VecDeque<(String, String)>,
    max_items: usize,
    max_bytes: usize,
    evicted: Vec<(String, EvictionReason)>,
}

fn weight(key: &str, value: &str) -> usize {
    (key.len() + value.len()) * 2
}

impl Model {
    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| weight(k, v)).sum()
    }

    fn set(&mut self, key: String, value: String) {
        if let Some(pos) = self.position(&key) {
            self.entries.remove(pos);
        }
        self.entries.push_front((key, value));

        if self.max_items > 0 {
            while self.entries.len() > self.max_items {
                let (k, _) = self.entries.pop_back().unwrap();
                self.evicted.push((k, EvictionReason::Count));
            }
        }
        if self.max_bytes > 0 {
            while self.bytes() > self.max_bytes {
                let (k, _) = self.entries.pop_back().unwrap();
                self.evicted.push((k, EvictionReason::Bytes));
            }
        }
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let pos = self.position(key)?;
        let entry = self.entries.remove(pos)?;
        let value = entry.1.clone();
        self.entries.push_front(entry);
        Some(value)
    }

    fn delete(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }
}

fn recorded(cache: &mut LruCache<String, String>) -> Arc<Mutex<Vec<(String, EvictionReason)>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    cache.subscribe(move |_, entry, reason| {
        sink.lock().unwrap().push((entry.key.clone(), reason));
    });
    events
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any sequence of operations, the recency order, the entry count and
    // the byte total match the model, and evictions are announced in order.
    #[test]
    fn prop_engine_matches_model(
        ops in prop::collection::vec(cache_op_strategy(), 1..80),
        max_items in 0usize..6,
        max_bytes in prop_oneof![Just(0usize), 20usize..120],
    ) {
        let config = CacheConfig::new().with_max_items(max_items).with_max_bytes(max_bytes);
        let mut cache = LruCache::new(config);
        let events = recorded(&mut cache);
        let mut model = Model { max_items, max_bytes, ..Model::default() };

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value.clone());
                    model.set(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key).cloned(), model.get(&key));
                }
                CacheOp::GetMeta { key } => {
                    let actual = cache.get_meta(&key).map(|e| (e.key.clone(), e.value.clone()));
                    let expected = model.get(&key).map(|v| (key.clone(), v));
                    prop_assert_eq!(actual, expected);
                }
                CacheOp::Has { key } => {
                    prop_assert_eq!(cache.has(&key), model.position(&key).is_some());
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.delete(&key));
                }
            }

            let actual: Vec<&str> = cache.keys().map(String::as_str).collect();
            prop_assert_eq!(actual, model.keys());
            let reversed: Vec<&str> = cache.keys().rev().map(String::as_str).collect();
            let mut expected_reversed = model.keys();
            expected_reversed.reverse();
            prop_assert_eq!(reversed, expected_reversed);
            prop_assert_eq!(cache.len(), model.entries.len());
            prop_assert_eq!(cache.total_bytes(), model.bytes());
            let summed: usize = cache.iter().map(|e| e.byte_size).sum();
            prop_assert_eq!(summed, cache.total_bytes());
            if max_items > 0 {
                prop_assert!(cache.len() <= max_items);
            }
            if max_bytes > 0 {
                prop_assert!(cache.total_bytes() <= max_bytes);
            }
        }

        let announced = events.lock().unwrap().clone();
        prop_assert_eq!(announced, model.evicted);
    }

    // Inserting N + 1 distinct keys into a cache capped at N evicts exactly
    // the first key, once, for reason Count.
    #[test]
    fn prop_count_bound(capacity in 1usize..25) {
        let mut cache = LruCache::new(CacheConfig::new().with_max_items(capacity));
        let events = recorded(&mut cache);

        for idx in 0..=capacity {
            cache.set(format!("key{idx}"), format!("value{idx}"));
        }

        prop_assert_eq!(cache.len(), capacity);
        prop_assert!(!cache.has("key0"));
        let announced = events.lock().unwrap().clone();
        prop_assert_eq!(announced, vec![("key0".to_string(), EvictionReason::Count)]);
    }

    // Entries whose weights sum to exactly the budget all stay resident; one
    // more entry pushes out least recently used ones until the budget holds.
    #[test]
    fn prop_byte_bound(
        values in prop::collection::vec("[a-z]{1,10}", 1..12),
        extra in "[a-z]{1,40}",
    ) {
        let budget: usize = values
            .iter()
            .enumerate()
            .map(|(idx, v)| weight(&format!("k{idx:02}"), v))
            .sum();
        let mut cache = LruCache::new(CacheConfig::new().with_max_bytes(budget));
        let events = recorded(&mut cache);

        for (idx, value) in values.iter().enumerate() {
            cache.set(format!("k{idx:02}"), value.clone());
        }
        prop_assert_eq!(cache.total_bytes(), budget);
        prop_assert_eq!(cache.len(), values.len());
        prop_assert!(events.lock().unwrap().is_empty());

        let extra_weight = weight("extra", &extra);
        cache.set("extra".to_string(), extra);

        prop_assert!(cache.total_bytes() <= budget);
        let evicted = events.lock().unwrap();
        prop_assert!(evicted.iter().all(|(_, reason)| *reason == EvictionReason::Bytes));
        if extra_weight > budget {
            // implosion: nothing fits, the new entry goes last
            prop_assert!(cache.is_empty());
            prop_assert_eq!(cache.total_bytes(), 0);
            prop_assert_eq!(evicted.last().map(|(k, _)| k.as_str()), Some("extra"));
        } else {
            prop_assert!(cache.has("extra"));
            for (pos, (key, _)) in evicted.iter().enumerate() {
                prop_assert_eq!(key, &format!("k{pos:02}"));
            }
        }
    }

    // Reading the head key any number of times leaves the order untouched.
    #[test]
    fn prop_promotion_idempotence(
        keys in prop::collection::hash_set(key_strategy(), 1..10),
        reads in 1usize..10,
    ) {
        let mut cache = LruCache::new(CacheConfig::default());
        for key in &keys {
            cache.set(key.clone(), key.clone());
        }
        let before: Vec<String> = cache.keys().cloned().collect();

        for _ in 0..reads {
            let head = cache.keys().next().cloned().unwrap();
            prop_assert!(cache.get(&head).is_some());
        }

        let after: Vec<String> = cache.keys().cloned().collect();
        prop_assert_eq!(before, after);
    }

    // Whatever is stored comes back: the value through get and every
    // metadata field through get_meta.
    #[test]
    fn prop_roundtrip_with_metadata(
        key in key_strategy(),
        value in value_strategy(),
        fields in prop::collection::btree_map("m_[a-z]{1,6}", any::<i64>(), 0..6),
    ) {
        let mut cache = LruCache::new(CacheConfig::default());
        let metadata: Metadata = fields
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();

        cache.set_with_meta(key.clone(), value.clone(), metadata);

        prop_assert_eq!(cache.get(&key), Some(&value));
        let entry = cache.get_meta(&key).unwrap();
        for (field, expected) in &fields {
            prop_assert_eq!(&entry.metadata[field.as_str()], &Value::from(*expected));
        }
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_eviction_order_matches_engine_for_mixed_limits() {
        let config = CacheConfig::new().with_max_items(3).with_max_bytes(30);
        let mut cache = LruCache::new(config);
        let mut model = Model { max_items: 3, max_bytes: 30, ..Model::default() };

        for (key, value) in [("a", "xx"), ("b", "xxxx"), ("c", "x"), ("d", "xxxxxxxx")] {
            cache.set(key.to_string(), value.to_string());
            model.set(key.to_string(), value.to_string());
        }

        let actual: Vec<&str> = cache.keys().map(String::as_str).collect();
        assert_eq!(actual, model.keys());
        assert_eq!(cache.total_bytes(), model.bytes());
    }
}
