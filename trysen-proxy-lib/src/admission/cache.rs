//! Weight-bounded key/value store with per-entry expiry.
//!
//! Expired entries are dropped lazily when they are looked up. When an insert would push the
//! total weight over capacity, entries are evicted in the order they were last written
//! (oldest refresh first) until the new entry fits.

use ahash::AHashMap;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::hash::Hash;
use tokio::time::Instant;

struct Slot<V> {
    value: V,
    weight: usize,
    expires_at: Instant,
    seq: u64,
}

pub struct BoundedExpiringCache<K, V> {
    entries: AHashMap<K, Slot<V>>,
    // refresh sequence -> key, oldest first
    order: BTreeMap<u64, K>,
    next_seq: u64,
    total_weight: usize,
    max_weight: usize,
    evictions: u64,
}

impl<K, V> BoundedExpiringCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache whose live entries never weigh more than `max_weight` in total.
    pub fn new(max_weight: usize) -> Self {
        Self {
            entries: AHashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            total_weight: 0,
            max_weight,
            evictions: 0,
        }
    }

    /// Value stored for `key`, or `None` if it was never set, was evicted, or has expired.
    pub fn get<Q>(&mut self, key: &Q, now: Instant) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            Some(slot) => now >= slot.expires_at,
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|slot| &slot.value)
    }

    pub fn contains<Q>(&mut self, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key, now).is_some()
    }

    /// Insert or refresh `key`.
    ///
    /// Returns `false` without touching the cache when `weight` alone exceeds the capacity.
    /// A refreshed entry moves to the back of the eviction order.
    pub fn set(&mut self, key: K, value: V, weight: usize, expires_at: Instant) -> bool {
        if weight > self.max_weight {
            return false;
        }

        if let Some(old) = self.entries.remove(&key) {
            self.order.remove(&old.seq);
            self.total_weight = self.total_weight.saturating_sub(old.weight);
        }

        while self.total_weight.saturating_add(weight) > self.max_weight {
            let Some((_, victim)) = self.order.pop_first() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&victim) {
                self.total_weight = self.total_weight.saturating_sub(slot.weight);
                self.evictions = self.evictions.saturating_add(1);
            }
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.order.insert(seq, key.clone());
        self.entries.insert(key, Slot { value, weight, expires_at, seq });
        self.total_weight = self.total_weight.saturating_add(weight);
        true
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        self.total_weight = self.total_weight.saturating_sub(slot.weight);
        Some(slot.value)
    }

    /// Drop every entry that expired at or before `now`. Returns how many were dropped.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<(u64, K)> = self
            .order
            .iter()
            .filter(|(_, key)| {
                self.entries
                    .get(*key)
                    .is_some_and(|slot| now >= slot.expires_at)
            })
            .map(|(seq, key)| (*seq, key.clone()))
            .collect();

        for (seq, key) in &expired {
            self.order.remove(seq);
            if let Some(slot) = self.entries.remove(key) {
                self.total_weight = self.total_weight.saturating_sub(slot.weight);
            }
        }
        expired.len()
    }

    /// Number of stored entries, expired ones included until they are looked up or purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> usize {
        self.total_weight
    }

    pub fn capacity(&self) -> usize {
        self.max_weight
    }

    /// Entries removed to make room since the cache was created.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}
