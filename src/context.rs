//! Cache Context
//!
//! Top-level wiring for one execution context: its store, facades,
//! invalidation manager and background tasks. Everything here is owned; the
//! only thing shared between contexts is the invalidation bus (and, when
//! configured, the storage medium).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheStore, MemoryBackend, SharedStore, StorageBackend};
use crate::config::Config;
use crate::domain::DomainCache;
use crate::invalidation::{
    ChangeType, ContextId, DataType, InvalidationBus, InvalidationManager, InvalidationReport,
};
use crate::tasks::{spawn_cleanup_task, spawn_listener_task, spawn_staleness_task};

// == Cache Context ==
#[derive(Debug)]
pub struct CacheContext {
    store: SharedStore,
    domain: DomainCache,
    invalidation: InvalidationManager,
    tasks: Vec<JoinHandle<()>>,
}

impl CacheContext {
    /// Builds a context from configuration and starts its background tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, bus: InvalidationBus) -> Self {
        let mut store = CacheStore::from_config(config);
        if let Some(quota) = config.storage_quota_bytes {
            let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::with_quota(quota));
            store = store.with_backend(backend);
        }
        Self::with_store(store, config, bus)
    }

    /// Starts a context around an already built store.
    pub fn with_store(store: CacheStore, config: &Config, bus: InvalidationBus) -> Self {
        let store = store.into_shared();
        let domain = DomainCache::new(store.clone());
        let invalidation = InvalidationManager::new(store.clone(), bus)
            .with_staleness_threshold(config.staleness_threshold);

        let tasks = vec![
            spawn_listener_task(invalidation.clone()),
            spawn_cleanup_task(
                store.clone(),
                Duration::from_secs(config.cleanup_interval.max(1)),
            ),
            spawn_staleness_task(
                invalidation.clone(),
                Duration::from_secs(config.staleness_interval.max(1)),
            ),
        ];

        info!("Cache context {:?} started", invalidation.context());

        Self {
            store,
            domain,
            invalidation,
            tasks,
        }
    }

    pub fn id(&self) -> ContextId {
        self.invalidation.context()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn domain(&self) -> &DomainCache {
        &self.domain
    }

    pub fn invalidation(&self) -> &InvalidationManager {
        &self.invalidation
    }

    pub async fn invalidate_on_data_change(
        &self,
        data_type: impl Into<DataType>,
        change_type: impl Into<ChangeType>,
    ) -> InvalidationReport {
        self.invalidation
            .invalidate_on_data_change(data_type, change_type)
            .await
    }

    /// Empties this context's store.
    pub async fn clear_cache(&self) {
        self.store.write().await.clear();
        info!("Cache cleared for {:?}", self.id());
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Cancels every background task. Safe to call more than once.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Cache context {:?} shut down", self.invalidation.context());
    }
}

impl Drop for CacheContext {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
