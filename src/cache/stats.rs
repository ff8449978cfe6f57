//! Cache Statistics Module
//!
//! Request counters kept by the store, and the diagnostic snapshots derived
//! from store contents on demand.

use std::collections::BTreeMap;

use serde::Serialize;

/// Maximum number of keys included in a stats sample.
pub const SAMPLE_KEY_LIMIT: usize = 10;

/// Maximum number of entries listed in detailed stats.
pub const DETAILED_ENTRY_LIMIT: usize = 50;

// == Cache Counters ==
/// True request counters, tracked incrementally.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheCounters {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
    /// Number of expired entries removed, lazily or by sweep
    pub expirations: u64,
    /// Number of writes the store declined to retain
    pub dropped_writes: u64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Request Hit Rate ==
    /// Calculates hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn request_hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_dropped_write(&mut self) {
        self.dropped_writes += 1;
    }
}

// == Cache Stats ==
/// Snapshot returned by `stats()`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Current number of entries, expired-but-unswept included
    pub size: usize,
    /// Configured capacity
    pub max_size: usize,
    /// Approximate footprint in bytes (UTF-16 units of key and value, x2)
    pub memory_bytes: usize,
    /// Entries past their expiry that have not been removed yet
    pub expired_count: usize,
    /// Freshness ratio `(size - expired_count) / size`, not a request hit rate
    pub hit_rate: f64,
    /// Up to ten keys
    pub sample_keys: Vec<String>,
}

impl CacheStats {
    /// Fraction of capacity in use.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.size as f64 / self.max_size as f64
        }
    }
}

/// Freshness ratio of a store holding `size` entries of which `expired` are stale.
pub fn freshness_ratio(size: usize, expired: usize) -> f64 {
    if size == 0 {
        0.0
    } else {
        size.saturating_sub(expired) as f64 / size as f64
    }
}

// == Detailed Stats ==
/// Per-entry view used by the monitoring dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDetail {
    pub key: String,
    pub age_ms: u64,
    pub ttl_remaining_ms: u64,
    pub expired: bool,
    pub last_accessed_seq: u64,
    pub approx_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedStats {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub counters: CacheCounters,
    pub entries: Vec<EntryDetail>,
}

// == Performance Metrics ==
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub hits: u64,
    pub misses: u64,
    pub request_hit_rate: f64,
    pub evictions: u64,
    pub expirations: u64,
    pub dropped_writes: u64,
    pub utilization: f64,
    pub average_entry_bytes: usize,
}

impl PerformanceMetrics {
    pub fn from_parts(counters: &CacheCounters, stats: &CacheStats) -> Self {
        let average_entry_bytes = if stats.size == 0 {
            0
        } else {
            stats.memory_bytes / stats.size
        };
        Self {
            hits: counters.hits,
            misses: counters.misses,
            request_hit_rate: counters.request_hit_rate(),
            evictions: counters.evictions,
            expirations: counters.expirations,
            dropped_writes: counters.dropped_writes,
            utilization: stats.utilization(),
            average_entry_bytes,
        }
    }
}

// == Size By Type ==
/// Entry count and footprint of one namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeUsage {
    pub entries: usize,
    pub bytes: usize,
}

/// Namespace -> usage, ordered by namespace.
pub type SizeByType = BTreeMap<String, TypeUsage>;
