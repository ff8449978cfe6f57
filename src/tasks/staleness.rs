//! Staleness Sweep Task
//!
//! Backstop for missed invalidation signals: entries of the managed key
//! groups are dropped once older than the staleness threshold, independently
//! of their TTL.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::invalidation::InvalidationManager;

pub fn spawn_staleness_task(manager: InvalidationManager, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting staleness sweep with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let stale = manager.sweep_stale().await;
            if stale.is_empty() {
                debug!("Staleness sweep: nothing stale");
            } else {
                info!("Staleness sweep: dropped {} stale entries", stale.len());
            }
        }
    })
}
