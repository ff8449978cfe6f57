//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction using a
//! monotonic logical clock instead of wall-clock time.

use std::collections::HashMap;

use crate::cache::CacheKey;

// == LRU Tracker ==
/// Tracks access rank for LRU eviction strategy.
///
/// Every touch hands out the next sequence number, so ranks are unique and
/// the smallest rank is always the least recently used key.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Access rank per key
    ranks: HashMap<CacheKey, u64>,
    /// Next sequence number to hand out
    next_seq: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used and returns its new rank.
    pub fn touch(&mut self, key: &CacheKey) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.ranks.insert(key.clone(), seq);
        seq
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &CacheKey) {
        self.ranks.remove(key);
    }

    // == Evict Oldest ==
    /// Returns and removes the key with the smallest rank.
    ///
    /// Linear scan over all tracked keys. Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<CacheKey> {
        let oldest = self.peek_oldest()?.clone();
        self.ranks.remove(&oldest);
        Some(oldest)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&CacheKey> {
        self.ranks
            .iter()
            .min_by_key(|(_, seq)| **seq)
            .map(|(key, _)| key)
    }

    /// Current rank of a key.
    pub fn rank(&self, key: &CacheKey) -> Option<u64> {
        self.ranks.get(key).copied()
    }

    // == Clear ==
    /// Forgets every key and restarts the sequence.
    pub fn clear(&mut self) {
        self.ranks.clear();
        self.next_seq = 0;
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}
