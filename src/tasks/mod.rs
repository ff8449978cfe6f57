//! Background Tasks Module
//!
//! Tasks a cache context runs for its whole lifetime.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Staleness Sweep: Drops managed entries older than the staleness threshold
//! - Listener: Applies invalidation signals from other contexts

mod cleanup;
mod listener;
mod staleness;

pub use cleanup::spawn_cleanup_task;
pub use listener::spawn_listener_task;
pub use staleness::spawn_staleness_task;
