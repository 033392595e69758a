//! A TTL-aware cache and a plain multimap.
//!
//! `TtlCache` backs the schema retriever's positive/negative caches
//!: each entry remembers when it expires, and entries with
//! no expiration (`None`) are kept forever — used for explicitly-injected
//! classes.6.
//!
//! `MultiMap` backs the permission checker's `(kind, channel) -> rules`
//! index: a key may have several values,
//! inserted in order, with duplicates kept (two policies can name the same
//! channel).

use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// A cache where entries can expire. Expiry is checked lazily on read —
/// there's no background sweeper, matching the single-threaded cooperative
/// scheduling model.
pub struct TtlCache<K, V> {
    entries: FxHashMap<K, Entry<V>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        TtlCache {
            entries: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value with a finite TTL.
    pub fn insert(&mut self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    /// Insert a value that never expires (an explicitly-injected class).
    pub fn insert_permanent(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    /// Look up a key, returning `None` if absent or expired. An expired
    /// entry is evicted as a side effect of the lookup.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| Instant::now() >= at),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An insertion-ordered multimap. Duplicate `(key, value)` pairs are kept:
/// two permission rules may both apply to the same `(kind, channel)`.
pub struct MultiMap<K, V> {
    entries: FxHashMap<K, Vec<V>>,
}

impl<K, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        MultiMap {
            entries: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V> MultiMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.entry(key).or_default().push(value);
    }

    #[must_use]
    pub fn get(&self, key: &K) -> &[V] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_cache_expires() {
        let mut cache = TtlCache::new();
        cache.insert("com.xkcd", 1, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"com.xkcd"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn ttl_cache_permanent_never_expires() {
        let mut cache = TtlCache::new();
        cache.insert_permanent("com.builtin", 42);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get(&"com.builtin"), Some(&42));
    }

    #[test]
    fn multimap_keeps_duplicates() {
        let mut mm = MultiMap::new();
        mm.insert(("com.foo", "q"), 1);
        mm.insert(("com.foo", "q"), 2);
        mm.insert(("com.bar", "q"), 3);
        assert_eq!(mm.get(&("com.foo", "q")), &[1, 2]);
        assert_eq!(mm.get(&("com.bar", "q")), &[3]);
        assert_eq!(mm.get(&("com.missing", "q")), &[] as &[i32]);
    }
}
