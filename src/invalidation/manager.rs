//! Invalidation Manager
//!
//! Turns data-change events into local cache clears plus bus signals, and
//! applies signals published by other contexts.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheKey, SharedStore};
use crate::invalidation::bus::{ContextId, InvalidationBus, InvalidationSignal};
use crate::invalidation::events::{managed_namespaces, ChangeType, DataType, KeyGroup};

/// Default age after which managed entries are swept, in seconds.
pub const DEFAULT_STALENESS_THRESHOLD: u64 = 300;

/// Callback run when another context invalidates a group.
pub type InvalidationCallback = Arc<dyn Fn(&InvalidationSignal) + Send + Sync>;

/// Handle returned by `on_invalidation`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ManagerState {
    /// No local invalidation in flight
    Idle,
    /// A local invalidation is being cleared and broadcast
    Notifying,
}

/// Outcome of one `invalidate_on_data_change` call.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationReport {
    pub data_type: String,
    pub change_type: String,
    pub groups: Vec<KeyGroup>,
    /// Local entries removed
    pub removed: usize,
    /// Bus deliveries, the local context's own subscription included
    pub delivered: usize,
}

type ListenerMap = HashMap<KeyGroup, Vec<(ListenerId, InvalidationCallback)>>;

/// Counts one in-flight invalidation for as long as it is held.
struct NotifyGuard {
    in_flight: Arc<AtomicUsize>,
}

impl NotifyGuard {
    fn enter(in_flight: &Arc<AtomicUsize>) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            in_flight: in_flight.clone(),
        }
    }
}

impl Drop for NotifyGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// == Invalidation Manager ==
#[derive(Clone)]
pub struct InvalidationManager {
    context: ContextId,
    store: SharedStore,
    bus: InvalidationBus,
    listeners: Arc<RwLock<ListenerMap>>,
    next_listener: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
    staleness_threshold_ms: u64,
}

impl fmt::Debug for InvalidationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationManager")
            .field("context", &self.context)
            .field("staleness_threshold_ms", &self.staleness_threshold_ms)
            .finish_non_exhaustive()
    }
}

impl InvalidationManager {
    /// Creates a manager for a new context on `bus`.
    pub fn new(store: SharedStore, bus: InvalidationBus) -> Self {
        let context = bus.register_context();
        Self {
            context,
            store,
            bus,
            listeners: Arc::new(RwLock::new(HashMap::new())),
            next_listener: Arc::new(AtomicU64::new(1)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            staleness_threshold_ms: DEFAULT_STALENESS_THRESHOLD * 1000,
        }
    }

    pub fn with_staleness_threshold(mut self, threshold_secs: u64) -> Self {
        self.staleness_threshold_ms = threshold_secs * 1000;
        self
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    pub fn state(&self) -> ManagerState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            ManagerState::Notifying
        } else {
            ManagerState::Idle
        }
    }

    // == Invalidate On Data Change ==
    /// Clears every key group the change maps to and tells other contexts.
    ///
    /// Unknown data types fall back to the user group. Never fails: a signal
    /// nobody receives is dropped, and the local clear has already happened.
    pub async fn invalidate_on_data_change(
        &self,
        data_type: impl Into<DataType>,
        change_type: impl Into<ChangeType>,
    ) -> InvalidationReport {
        let data_type = data_type.into();
        let change_type = change_type.into();
        let groups = data_type.key_groups().to_vec();

        let _notifying = NotifyGuard::enter(&self.in_flight);

        let mut removed = 0;
        {
            let mut store = self.store.write().await;
            for group in &groups {
                removed += store.invalidate_namespace(group.namespace());
            }
        }

        let timestamp = self.store.read().await.now_ms();
        let mut delivered = 0;
        for group in &groups {
            delivered += self.bus.publish(InvalidationSignal {
                origin: self.context,
                group: *group,
                data_type: data_type.clone(),
                change_type: change_type.clone(),
                timestamp,
            });
        }

        info!(
            "Invalidated {} entries for {} {} ({} groups)",
            removed,
            data_type,
            change_type,
            groups.len()
        );

        InvalidationReport {
            data_type: data_type.to_string(),
            change_type: change_type.to_string(),
            groups,
            removed,
            delivered,
        }
    }

    // == Listener Registry ==
    /// Runs `callback` whenever another context invalidates `group`.
    pub async fn on_invalidation<F>(&self, group: KeyGroup, callback: F) -> ListenerId
    where
        F: Fn(&InvalidationSignal) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .write()
            .await
            .entry(group)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Unregisters a callback. Returns whether it was registered.
    pub async fn off_invalidation(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().await;
        let mut found = false;
        for callbacks in listeners.values_mut() {
            let before = callbacks.len();
            callbacks.retain(|(listener, _)| *listener != id);
            found |= callbacks.len() != before;
        }
        listeners.retain(|_, callbacks| !callbacks.is_empty());
        found
    }

    // == Handle Remote ==
    /// Applies a signal from the bus: clears the group locally and runs its
    /// callbacks. Signals this context published itself are ignored.
    ///
    /// Returns the number of callbacks run.
    pub async fn handle_remote(&self, signal: &InvalidationSignal) -> usize {
        if signal.origin == self.context {
            return 0;
        }

        let removed = self
            .store
            .write()
            .await
            .invalidate_namespace(signal.group.namespace());

        let callbacks: Vec<InvalidationCallback> = self
            .listeners
            .read()
            .await
            .get(&signal.group)
            .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        for callback in &callbacks {
            callback(signal);
        }

        debug!(
            "Applied remote invalidation of '{}' from {:?}: {} entries, {} callbacks",
            signal.group,
            signal.origin,
            removed,
            callbacks.len()
        );
        callbacks.len()
    }

    // == Staleness Sweep ==
    /// Removes managed entries older than the staleness threshold, whatever
    /// their TTL. Local only; other contexts run their own sweep.
    pub async fn sweep_stale(&self) -> Vec<CacheKey> {
        let namespaces = managed_namespaces();
        self.store
            .write()
            .await
            .remove_older_than(self.staleness_threshold_ms, &namespaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, ManualClock};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn manager_on(bus: &InvalidationBus, clock: &ManualClock) -> InvalidationManager {
        let store = CacheStore::new(100, 300)
            .with_clock(Arc::new(clock.clone()))
            .into_shared();
        InvalidationManager::new(store, bus.clone())
    }

    async fn seed(manager: &InvalidationManager) {
        let mut store = manager.store.write().await;
        for key in [
            "user:u1",
            "userData:u1",
            "userPreferences:u1",
            "mathlabRequests:u1",
            "mathlabSessions:u1",
            "school:s1",
        ] {
            store.set(key, json!(key), None);
        }
    }

    async fn live(manager: &InvalidationManager, key: &str) -> bool {
        manager.store.read().await.contains(&CacheKey::parse(key))
    }

    #[tokio::test]
    async fn test_role_switch_clears_user_and_tutoring_groups() {
        let bus = InvalidationBus::new(16);
        let manager = manager_on(&bus, &ManualClock::new(0));
        seed(&manager).await;

        let report = manager
            .invalidate_on_data_change("mathlab_role", "update")
            .await;

        assert_eq!(report.removed, 3);
        assert!(!live(&manager, "userData:u1").await);
        assert!(!live(&manager, "mathlabRequests:u1").await);
        assert!(!live(&manager, "mathlabSessions:u1").await);
        assert!(live(&manager, "school:s1").await);
        assert!(live(&manager, "user:u1").await);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[tokio::test]
    async fn test_state_stays_notifying_while_any_invalidation_runs() {
        let bus = InvalidationBus::new(16);
        let manager = manager_on(&bus, &ManualClock::new(0));

        let first = NotifyGuard::enter(&manager.in_flight);
        let second = NotifyGuard::enter(&manager.in_flight);
        drop(first);
        assert_eq!(manager.state(), ManagerState::Notifying);

        drop(second);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_invalidation_returns_to_idle() {
        let bus = InvalidationBus::new(16);
        let manager = manager_on(&bus, &ManualClock::new(0));

        // Hold the store so the invalidation parks on the write lock
        let held = manager.store.clone();
        let guard = held.write().await;

        let pending = manager.clone();
        let task = tokio::spawn(async move {
            pending.invalidate_on_data_change("tag", "update").await;
        });
        while manager.state() != ManagerState::Notifying {
            tokio::task::yield_now().await;
        }

        task.abort();
        let _ = task.await;
        drop(guard);

        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[tokio::test]
    async fn test_unknown_type_clears_fallback_group_only() {
        let bus = InvalidationBus::new(16);
        let manager = manager_on(&bus, &ManualClock::new(0));
        seed(&manager).await;

        let report = manager.invalidate_on_data_change("bogus_type", "x").await;

        assert_eq!(report.groups, vec![KeyGroup::User]);
        assert_eq!(report.removed, 1);
        assert!(!live(&manager, "user:u1").await);
        assert!(live(&manager, "userData:u1").await);
        assert!(live(&manager, "mathlabRequests:u1").await);
        assert!(live(&manager, "school:s1").await);
    }

    #[tokio::test]
    async fn test_remote_signal_runs_callbacks_and_clears() {
        let bus = InvalidationBus::new(16);
        let clock = ManualClock::new(0);
        let tab_a = manager_on(&bus, &clock);
        let tab_b = manager_on(&bus, &clock);
        seed(&tab_a).await;

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        tab_a
            .on_invalidation(KeyGroup::MathlabSessions, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let mut rx = bus.subscribe();
        tab_b
            .invalidate_on_data_change("tutoring_session", "end")
            .await;

        let mut ran = 0;
        while let Ok(signal) = rx.try_recv() {
            ran += tab_a.handle_remote(&signal).await;
        }

        assert_eq!(ran, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!live(&tab_a, "mathlabSessions:u1").await);
        assert!(live(&tab_a, "userData:u1").await);
    }

    #[tokio::test]
    async fn test_own_signals_are_ignored() {
        let bus = InvalidationBus::new(16);
        let manager = manager_on(&bus, &ManualClock::new(0));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        manager
            .on_invalidation(KeyGroup::User, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let mut rx = bus.subscribe();
        manager.invalidate_on_data_change("user_profile", "update").await;

        while let Ok(signal) = rx.try_recv() {
            manager.handle_remote(&signal).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_off_invalidation() {
        let bus = InvalidationBus::new(16);
        let manager = manager_on(&bus, &ManualClock::new(0));

        let id = manager.on_invalidation(KeyGroup::Tags, |_| {}).await;

        assert!(manager.off_invalidation(id).await);
        assert!(!manager.off_invalidation(id).await);
    }

    #[tokio::test]
    async fn test_sweep_stale_only_touches_managed_groups() {
        let bus = InvalidationBus::new(16);
        let clock = ManualClock::new(0);
        let manager = manager_on(&bus, &clock).with_staleness_threshold(300);
        {
            let mut store = manager.store.write().await;
            store.set("userData:u1", json!(1), Some(3600));
            store.set("school:s1", json!(1), Some(3600));
        }

        clock.advance_secs(200);
        assert!(manager.sweep_stale().await.is_empty());

        clock.advance_secs(101);
        let swept = manager.sweep_stale().await;

        assert_eq!(swept, vec![CacheKey::parse("userData:u1")]);
        assert!(live(&manager, "school:s1").await);
    }
}
