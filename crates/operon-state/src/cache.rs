//! Bounded read-through cache for hot state lookups.
//!
//! The cache is a pure read accelerator over committed rows: it never
//! influences write ordering or processing decisions, only how fast a read
//! resolves. Recency is tracked with a logical access counter rather than
//! wall time, so cache behavior is identical across replicas.
//!
//! # Transactional discipline
//!
//! Reads inside a command's transaction may populate the cache before the
//! transaction commits. Populated keys are therefore recorded until the
//! owning store signals the transaction boundary: `on_commit` forgets the
//! record, `on_abort` evicts the recorded keys so uncommitted data never
//! survives its transaction. Writers invalidate affected keys at the point
//! of the write.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

struct Slot<V> {
    value: V,
    last_access: u64,
}

/// A bounded map with least-recently-used eviction.
pub struct BoundedCache<K, V> {
    name: &'static str,
    entries: HashMap<K, Slot<V>>,
    capacity: usize,
    tick: u64,
    populated_in_txn: Vec<K>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            capacity,
            tick: 0,
            populated_in_txn: Vec::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up a key, returning a defensive copy of the cached value.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.tick += 1;
        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.last_access = self.tick;
                self.hits += 1;
                Some(slot.value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a value read through from the store. The key is remembered as
    /// populated within the current transaction.
    pub fn populate(&mut self, key: K, value: V) {
        self.tick += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }
        self.populated_in_txn.push(key.clone());
        self.entries.insert(
            key,
            Slot {
                value,
                last_access: self.tick,
            },
        );
    }

    /// Drop a key whose backing row changed.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// The owning transaction committed: populated entries are now backed by
    /// committed rows.
    pub fn on_commit(&mut self) {
        self.populated_in_txn.clear();
    }

    /// The owning transaction aborted: entries populated during it may hold
    /// uncommitted data and are evicted.
    pub fn on_abort(&mut self) {
        for key in self.populated_in_txn.drain(..) {
            self.entries.remove(&key);
        }
    }

    fn evict_least_recent(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.last_access)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions += 1;
            debug!(
                cache = self.name,
                evictions = self.evictions,
                "cache eviction"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses, evictions)` counters.
    pub fn stats(&self) -> (u64, u64, u64) {
        (self.hits, self.misses, self.evictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_defensive_copies() {
        let mut cache: BoundedCache<i64, Vec<i64>> = BoundedCache::new("test", 8);
        cache.populate(1, vec![1, 2, 3]);

        let mut copy = cache.get(&1).unwrap();
        copy.push(4);

        assert_eq!(cache.get(&1).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn evicts_least_recently_used_at_capacity() {
        let mut cache: BoundedCache<i64, i64> = BoundedCache::new("test", 2);
        cache.populate(1, 10);
        cache.populate(2, 20);

        // Touch 1 so that 2 is the least recently used.
        cache.get(&1);
        cache.populate(3, 30);

        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&3), Some(30));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn replacing_a_key_does_not_evict() {
        let mut cache: BoundedCache<i64, i64> = BoundedCache::new("test", 2);
        cache.populate(1, 10);
        cache.populate(2, 20);
        cache.populate(1, 11);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some(11));
        assert_eq!(cache.get(&2), Some(20));
    }

    #[test]
    fn abort_evicts_entries_populated_in_the_transaction() {
        let mut cache: BoundedCache<i64, i64> = BoundedCache::new("test", 8);
        cache.populate(1, 10);
        cache.on_commit();

        cache.populate(2, 20);
        cache.get(&1);
        cache.on_abort();

        assert_eq!(cache.get(&1), Some(10), "committed entry survives");
        assert_eq!(cache.get(&2), None, "uncommitted entry evicted");
    }

    #[test]
    fn commit_retains_populated_entries() {
        let mut cache: BoundedCache<i64, i64> = BoundedCache::new("test", 8);
        cache.populate(1, 10);
        cache.on_commit();
        cache.on_abort();

        assert_eq!(cache.get(&1), Some(10));
    }

    #[test]
    fn invalidate_drops_the_entry() {
        let mut cache: BoundedCache<i64, i64> = BoundedCache::new("test", 8);
        cache.populate(1, 10);
        cache.invalidate(&1);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn stats_track_hits_misses_and_evictions() {
        let mut cache: BoundedCache<i64, i64> = BoundedCache::new("test", 1);
        cache.populate(1, 10);
        cache.get(&1);
        cache.get(&2);
        cache.populate(2, 20);

        let (hits, misses, evictions) = cache.stats();
        assert_eq!((hits, misses, evictions), (1, 1, 1));
    }
}
