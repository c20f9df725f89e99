//! Concurrent expiring key-value storage.
//!
//! `ExpiringStore` is the one shared mutable structure in the crate; the
//! rate limiter, response cache, and session tracker are all views over an
//! instance of it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Stored<V> {
    value: V,
    deadline: Instant,
}

impl<V> Stored<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Thread-safe map from key to `(value, deadline)` backed by DashMap.
///
/// Expiry is enforced twice over:
/// - **lazily**: `get` treats an entry whose deadline has passed as absent,
///   so correctness never depends on a sweep having run;
/// - **periodically**: `sweep` walks the map and drops every expired entry,
///   bounding memory between lazy hits.
///
/// All operations are average O(1) hash accesses under DashMap's per-shard
/// locks, except `sweep`, which is O(n) in the current entry count.
#[derive(Debug)]
pub struct ExpiringStore<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, Stored<V>>,
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Insert or replace a value, alive until `now + ttl`.
    pub fn insert(&self, key: K, value: V, ttl: Duration, now: Instant) {
        self.map.insert(
            key,
            Stored {
                value,
                deadline: now + ttl,
            },
        );
    }

    /// Get a clone of a live value.
    ///
    /// An entry whose deadline has passed is reported absent even if it has
    /// not been swept yet; it is removed on the way out.
    pub fn get(&self, key: &K, now: Instant) -> Option<V>
    where
        V: Clone,
    {
        let expired = {
            let entry = self.map.get(key)?;
            if entry.is_expired(now) {
                true
            } else {
                return Some(entry.value.clone());
            }
        };
        if expired {
            self.map.remove_if(key, |_, stored| stored.is_expired(now));
        }
        None
    }

    /// Whether a live entry exists for `key`, without cloning or refreshing.
    pub fn contains_live(&self, key: &K, now: Instant) -> bool {
        self.map
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    /// Mutate the value under `key` while holding its shard lock, creating
    /// it with `factory` if absent or expired.
    ///
    /// Every call pushes the deadline out to `now + ttl`, so entries expire
    /// from *last activity* rather than creation. This is what serializes
    /// concurrent admission checks for one identity: two callers mutating
    /// the same key are ordered by the shard lock.
    pub fn with_entry_mut<R>(
        &self,
        key: K,
        ttl: Duration,
        now: Instant,
        factory: impl FnOnce() -> V,
        accessor: impl FnOnce(&mut V) -> R,
    ) -> R {
        match self.map.entry(key) {
            Entry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                if stored.is_expired(now) {
                    stored.value = factory();
                }
                stored.deadline = now + ttl;
                accessor(&mut stored.value)
            }
            Entry::Vacant(vacant) => {
                let mut stored = vacant.insert(Stored {
                    value: factory(),
                    deadline: now + ttl,
                });
                accessor(&mut stored.value)
            }
        }
    }

    /// Remove an entry, returning its value if one was present (live or not).
    pub fn remove(&self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(_, stored)| stored.value)
    }

    /// Drop every entry whose deadline has passed, returning how many were
    /// removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, stored| !stored.is_expired(now));
        before.saturating_sub(self.map.len())
    }

    /// Number of entries currently held, including expired-but-unswept ones.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drop every entry regardless of expiry.
    pub fn clear(&self) {
        self.map.clear();
    }
}

impl<K, V> Default for ExpiringStore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
