//! Storage Medium Module
//!
//! Persistent backing a store can write entries through to. The medium is
//! shared by every context that holds a clone of it, the way browser tabs
//! share one origin's local storage.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use crate::error::{CacheError, Result};

/// Prefix of every entry written to the medium.
pub const STORAGE_PREFIX: &str = "cache:";

/// Builds the medium key an entry is persisted under.
pub fn storage_key(cache_key: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, cache_key)
}

// == Storage Backend ==
/// A string-keyed storage medium that may refuse writes.
pub trait StorageBackend: Send + Sync + Debug {
    fn set_item(&self, key: &str, payload: &str) -> Result<()>;
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn remove_item(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

// == Memory Backend ==
/// In-process storage medium with an optional byte quota.
///
/// Usage is counted as UTF-16 code units of key plus payload, two bytes each.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Creates a medium without a quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a medium that refuses writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used.
    pub fn used_bytes(&self) -> usize {
        self.items
            .lock()
            .map(|items| items.iter().map(|(k, v)| item_bytes(k, v)).sum())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| CacheError::StorageUnavailable("storage lock poisoned".to_string()))
    }
}

fn item_bytes(key: &str, payload: &str) -> usize {
    (key.encode_utf16().count() + payload.encode_utf16().count()) * 2
}

impl StorageBackend for MemoryBackend {
    fn set_item(&self, key: &str, payload: &str) -> Result<()> {
        let mut items = self.lock()?;

        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| item_bytes(k, v))
                .sum();
            let needed = item_bytes(key, payload);
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(CacheError::QuotaExceeded { needed, available });
            }
        }

        items.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
