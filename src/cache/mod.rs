//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU eviction and an
//! optional write-through storage medium.

mod clock;
mod entry;
mod key;
mod lru;
mod stats;
mod storage;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, StoredEntry};
pub use key::CacheKey;
pub use lru::LruTracker;
pub use stats::{
    CacheCounters, CacheStats, DetailedStats, EntryDetail, PerformanceMetrics, SizeByType,
    TypeUsage,
};
pub use storage::{storage_key, MemoryBackend, StorageBackend, STORAGE_PREFIX};
pub use store::{CacheStore, SharedStore};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
