//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries, so memory
//! is reclaimed even for keys nobody reads again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedStore;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between cleanup runs. It acquires a write lock on the cache store to
/// remove expired entries.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted by the owning context on shutdown.
pub fn spawn_cleanup_task(cache: SharedStore, cleanup_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {:?}",
            cleanup_interval
        );

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let removed = cache.write().await.cleanup();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
