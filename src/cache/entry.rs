//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support, and
//! the `{ value, expiry }` payload written to a persistent storage medium.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Write timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Logical access rank, bumped on every read and write
    pub last_accessed_seq: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry written at `now` that lives for `ttl_seconds`.
    pub fn new(value: Value, now: u64, ttl_seconds: u64, seq: u64) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl_seconds.saturating_mul(1000)),
            last_accessed_seq: seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now >= expires_at`, so a zero TTL produces an
    /// entry that is already expired when written.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    /// Milliseconds since the entry was written.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Approximate footprint: UTF-16 code units of key and serialized value,
    /// two bytes each.
    pub fn approx_bytes(&self, key_len_utf16: usize) -> usize {
        let value_units = serde_json::to_string(&self.value)
            .map(|s| s.encode_utf16().count())
            .unwrap_or(0);
        (key_len_utf16 + value_units) * 2
    }
}

// == Stored Entry ==
/// Persisted layout of an entry on the storage medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds)
    pub expiry: u64,
}
