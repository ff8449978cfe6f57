//! Cross-context invalidation.
//!
//! Domain code reports a mutation as a `(DataType, ChangeType)` pair; the
//! manager clears the matching key groups and publishes one signal per group
//! on the bus so other contexts clear theirs and wake their listeners.

pub mod bus;
pub mod events;
pub mod manager;

pub use bus::{ContextId, InvalidationBus, InvalidationSignal};
pub use events::{managed_namespaces, ChangeType, DataType, KeyGroup};
pub use manager::{
    InvalidationCallback, InvalidationManager, InvalidationReport, ListenerId, ManagerState,
};
