//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration, a namespace index and an optional persistent medium.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::stats::{
    freshness_ratio, DetailedStats, EntryDetail, DETAILED_ENTRY_LIMIT, SAMPLE_KEY_LIMIT,
};
use crate::cache::storage::{storage_key, StorageBackend, STORAGE_PREFIX};
use crate::cache::{
    CacheCounters, CacheEntry, CacheKey, CacheStats, Clock, LruTracker, PerformanceMetrics,
    SizeByType, StoredEntry, SystemClock, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// A store owned by one execution context and shared with its background tasks.
pub type SharedStore = Arc<RwLock<CacheStore>>;

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
///
/// Public operations never fail towards the caller: invalid keys, oversized
/// values and storage-medium errors are logged and the write is dropped.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry>,
    /// Live keys per namespace
    namespaces: HashMap<String, HashSet<CacheKey>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Request counters
    counters: CacheCounters,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    clock: Arc<dyn Clock>,
    /// Write-through persistent medium
    backend: Option<Arc<dyn StorageBackend>>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl` - Default TTL in seconds for entries without explicit TTL
    pub fn new(max_entries: usize, default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            namespaces: HashMap::new(),
            lru: LruTracker::new(),
            counters: CacheCounters::new(),
            max_entries,
            default_ttl,
            clock: Arc::new(SystemClock),
            backend: None,
        }
    }

    /// Creates a CacheStore sized from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_entries, config.default_ttl)
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attaches a persistent medium and loads the unexpired entries it holds.
    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        let restored = self.hydrate();
        if restored > 0 {
            debug!("Restored {} entries from storage medium", restored);
        }
        self
    }

    /// Wraps the store for sharing with background tasks.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // == Set ==
    /// Stores a value with optional TTL.
    ///
    /// If the key already exists, the value is overwritten and TTL is reset.
    /// If the cache is at capacity, the least recently used entry is evicted.
    /// Returns whether the value was retained; a dropped write also removes any
    /// older value under the same key.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set(&mut self, key: impl Into<CacheKey>, value: Value, ttl: Option<u64>) -> bool {
        let key = key.into();
        match self.try_set(&key, value, ttl) {
            Ok(()) => true,
            Err(err) => {
                self.drop_write(&key, &err);
                false
            }
        }
    }

    /// Bookkeeping for a write that was not retained: counts it and removes
    /// any older value under the same key.
    pub fn drop_write(&mut self, key: &CacheKey, err: &CacheError) {
        warn!("Cache write for '{}' dropped: {}", key, err);
        self.counters.record_dropped_write();
        self.remove_entry(key);
    }

    /// Serializes `value` and stores it. Serialization failures drop the write.
    pub fn set_serialized<T: Serialize>(
        &mut self,
        key: impl Into<CacheKey>,
        value: &T,
        ttl: Option<u64>,
    ) -> bool {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl),
            Err(err) => {
                self.drop_write(&key, &CacheError::from(err));
                false
            }
        }
    }

    /// Fallible write used by `set`.
    pub fn try_set(&mut self, key: &CacheKey, value: Value, ttl: Option<u64>) -> Result<()> {
        if key.namespace().is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }

        // Validate key length
        if key.rendered_len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        let now = self.clock.now_ms();
        // Use provided TTL or default
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expiry = now.saturating_add(ttl.saturating_mul(1000));

        let stored = StoredEntry { value, expiry };
        let payload = serde_json::to_string(&stored)?;

        // Validate value size
        if payload.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let is_overwrite = self.entries.contains_key(key);

        // Victim is only removed once the medium has accepted the new payload
        let needs_eviction = !is_overwrite && self.entries.len() >= self.max_entries;
        if needs_eviction && self.lru.peek_oldest().is_none() {
            return Err(CacheError::CacheFull(
                "Cache has no capacity and nothing to evict".to_string(),
            ));
        }

        if let Some(backend) = &self.backend {
            backend.set_item(&storage_key(&key.to_string()), &payload)?;
        }

        if needs_eviction {
            if let Some(evicted) = self.lru.evict_oldest() {
                debug!("Evicting least recently used key '{}'", evicted);
                self.remove_entry(&evicted);
                self.counters.record_eviction();
            }
        }

        let seq = self.lru.touch(key);
        let entry = CacheEntry::new(stored.value, now, ttl, seq);
        self.entries.insert(key.clone(), entry);
        self.namespaces
            .entry(key.namespace().to_string())
            .or_default()
            .insert(key.clone());

        Ok(())
    }

    // == Lookup ==
    /// Retrieves a value by key, reporting why it is absent.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn lookup(&mut self, key: &CacheKey) -> Result<Value> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.counters.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
        };

        if expired {
            self.remove_entry(key);
            self.counters.record_expirations(1);
            self.counters.record_miss();
            return Err(CacheError::Expired(key.to_string()));
        }

        let seq = self.lru.touch(key);
        self.counters.record_hit();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed_seq = seq;
                Ok(entry.value.clone())
            }
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    // == Get ==
    /// Returns the value if present and unexpired.
    pub fn get(&mut self, key: impl Into<CacheKey>) -> Option<Value> {
        self.lookup(&key.into()).ok()
    }

    /// Returns the value deserialized as `T`. A payload of the wrong shape is a miss.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: impl Into<CacheKey>) -> Option<T> {
        let key = key.into();
        let value = self.lookup(&key).ok()?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                debug!("Cached value for '{}' did not parse: {}", key, err);
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key. Deleting a missing key is a no-op.
    ///
    /// Returns whether an entry was removed.
    pub fn delete(&mut self, key: impl Into<CacheKey>) -> bool {
        self.remove_entry(&key.into()).is_some()
    }

    // == Clear ==
    /// Removes every entry and resets internal counters.
    pub fn clear(&mut self) {
        let keys: Vec<CacheKey> = self.entries.keys().cloned().collect();
        for key in &keys {
            self.remove_backend_item(key);
        }
        self.entries.clear();
        self.namespaces.clear();
        self.lru.clear();
        self.counters = CacheCounters::new();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.counters.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Invalidate Namespace ==
    /// Removes every entry whose key lives in `namespace`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_namespace(&mut self, namespace: &str) -> usize {
        let keys: Vec<CacheKey> = self
            .namespaces
            .get(namespace)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();

        for key in &keys {
            self.remove_entry(key);
        }
        keys.len()
    }

    // == Remove Older Than ==
    /// Removes entries of the given namespaces written more than `max_age_ms` ago,
    /// whatever their TTL says.
    pub fn remove_older_than(&mut self, max_age_ms: u64, namespaces: &[&str]) -> Vec<CacheKey> {
        let now = self.clock.now_ms();
        let stale: Vec<CacheKey> = namespaces
            .iter()
            .filter_map(|ns| self.namespaces.get(*ns))
            .flatten()
            .filter(|key| {
                self.entries
                    .get(*key)
                    .map(|entry| entry.age_ms(now) > max_age_ms)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        for key in &stale {
            self.remove_entry(key);
        }
        stale
    }

    // == Keys ==
    /// Rendered keys of every stored entry, expired-but-unswept included.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().map(|key| key.to_string()).collect()
    }

    /// Keys currently stored in `namespace`.
    pub fn keys_in(&self, namespace: &str) -> Vec<CacheKey> {
        self.namespaces
            .get(namespace)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True if a live entry exists. Does not bump the access rank.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    /// Access rank of a stored key.
    pub fn access_rank(&self, key: &CacheKey) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.last_accessed_seq)
    }

    // == Stats ==
    /// Returns a snapshot derived from current contents.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let size = self.entries.len();
        let expired_count = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .count();

        CacheStats {
            size,
            max_size: self.max_entries,
            memory_bytes: self.memory_bytes(),
            expired_count,
            hit_rate: freshness_ratio(size, expired_count),
            sample_keys: self
                .entries
                .keys()
                .take(SAMPLE_KEY_LIMIT)
                .map(|key| key.to_string())
                .collect(),
        }
    }

    /// True request counters.
    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    pub fn detailed_stats(&self) -> DetailedStats {
        let now = self.clock.now_ms();
        let mut entries: Vec<EntryDetail> = self
            .entries
            .iter()
            .map(|(key, entry)| EntryDetail {
                key: key.to_string(),
                age_ms: entry.age_ms(now),
                ttl_remaining_ms: entry.ttl_remaining_ms(now),
                expired: entry.is_expired(now),
                last_accessed_seq: entry.last_accessed_seq,
                approx_bytes: entry.approx_bytes(utf16_len(key)),
            })
            .collect();
        // Most recently used first
        entries.sort_by(|a, b| b.last_accessed_seq.cmp(&a.last_accessed_seq));
        entries.truncate(DETAILED_ENTRY_LIMIT);

        DetailedStats {
            stats: self.stats(),
            counters: self.counters.clone(),
            entries,
        }
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics::from_parts(&self.counters, &self.stats())
    }

    pub fn size_by_type(&self) -> SizeByType {
        let mut sizes = SizeByType::new();
        for (key, entry) in &self.entries {
            let usage = sizes.entry(key.namespace().to_string()).or_default();
            usage.entries += 1;
            usage.bytes += entry.approx_bytes(utf16_len(key));
        }
        sizes
    }

    fn memory_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, entry)| entry.approx_bytes(utf16_len(key)))
            .sum()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn remove_entry(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.entries.remove(key);
        self.lru.remove(key);
        if let Some(keys) = self.namespaces.get_mut(key.namespace()) {
            keys.remove(key);
            if keys.is_empty() {
                self.namespaces.remove(key.namespace());
            }
        }
        self.remove_backend_item(key);
        removed
    }

    fn remove_backend_item(&self, key: &CacheKey) {
        if let Some(backend) = &self.backend {
            if let Err(err) = backend.remove_item(&storage_key(&key.to_string())) {
                debug!("Failed to remove '{}' from storage medium: {}", key, err);
            }
        }
    }

    /// Loads unexpired persisted entries, discarding expired or unreadable ones.
    fn hydrate(&mut self) -> usize {
        let Some(backend) = self.backend.clone() else {
            return 0;
        };

        let keys = match backend.keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!("Storage medium unavailable, starting empty: {}", err);
                return 0;
            }
        };

        let now = self.clock.now_ms();
        let mut restored = 0;
        for item_key in keys {
            let Some(raw_key) = item_key.strip_prefix(STORAGE_PREFIX) else {
                continue;
            };
            if self.entries.len() >= self.max_entries {
                break;
            }

            let parsed = backend
                .get_item(&item_key)
                .and_then(|payload| match payload {
                    Some(payload) => Ok(Some(serde_json::from_str::<StoredEntry>(&payload)?)),
                    None => Ok(None),
                });

            match parsed {
                Ok(Some(stored)) if stored.expiry > now => {
                    let key = CacheKey::parse(raw_key);
                    let seq = self.lru.touch(&key);
                    let entry = CacheEntry {
                        value: stored.value,
                        created_at: now,
                        expires_at: stored.expiry,
                        last_accessed_seq: seq,
                    };
                    self.entries.insert(key.clone(), entry);
                    self.namespaces
                        .entry(key.namespace().to_string())
                        .or_default()
                        .insert(key);
                    restored += 1;
                }
                Ok(Some(_)) | Ok(None) => {
                    let _ = backend.remove_item(&item_key);
                }
                Err(err) => {
                    debug!("Discarding unreadable entry '{}': {}", item_key, err);
                    let _ = backend.remove_item(&item_key);
                }
            }
        }
        restored
    }
}

fn utf16_len(key: &CacheKey) -> usize {
    key.to_string().encode_utf16().count()
}
