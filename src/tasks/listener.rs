//! Invalidation Listener Task
//!
//! Receives bus signals for one context and applies them through its manager.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::invalidation::InvalidationManager;

/// Spawns the listener for `manager`'s context.
///
/// The subscription is taken before this function returns, so signals
/// published afterwards are never missed because the task had not started.
pub fn spawn_listener_task(manager: InvalidationManager) -> JoinHandle<()> {
    let mut receiver = manager.bus().subscribe();

    tokio::spawn(async move {
        debug!("Invalidation listener started for {:?}", manager.context());

        loop {
            match receiver.recv().await {
                Ok(signal) => {
                    manager.handle_remote(&signal).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Invalidation listener for {:?} skipped {} signals",
                        manager.context(),
                        skipped
                    );
                }
                Err(RecvError::Closed) => {
                    debug!("Invalidation bus closed");
                    break;
                }
            }
        }
    })
}
