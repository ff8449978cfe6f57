//! Domain cache facades.
//!
//! Named read/write helpers over the shared store, each with a fixed key
//! template and TTL. Nothing here talks to the database: callers fetch on a
//! miss and populate the cache themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! let domain = DomainCache::new(store.clone());
//! let clubs: Vec<Club> = match domain.get_cached_clubs(&school_id).await {
//!     Some(clubs) => clubs,
//!     None => {
//!         let clubs = db.clubs_for_school(&school_id).await?;
//!         domain.cache_clubs(&school_id, &clubs).await;
//!         clubs
//!     }
//! };
//! ```

pub mod keys;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheKey, SharedStore};

// == Domain Cache ==
/// Facade set bound to one context's store.
#[derive(Debug, Clone)]
pub struct DomainCache {
    store: SharedStore,
}

impl DomainCache {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    async fn put<T: Serialize>(&self, key: CacheKey, value: &T, ttl: u64) -> bool {
        debug!("Caching {}", key);
        self.store.write().await.set_serialized(key, value, Some(ttl))
    }

    async fn fetch<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        // Write lock: reads bump the access rank
        self.store.write().await.get_as(key)
    }

    async fn drop_key(&self, key: CacheKey) -> bool {
        self.store.write().await.delete(key)
    }

    // == Users ==
    pub async fn cache_user<T: Serialize>(&self, uid: &str, user: &T) -> bool {
        self.put(keys::user(uid), user, keys::USER_TTL).await
    }

    pub async fn get_cached_user<T: DeserializeOwned>(&self, uid: &str) -> Option<T> {
        self.fetch(keys::user(uid)).await
    }

    pub async fn invalidate_user(&self, uid: &str) -> bool {
        self.drop_key(keys::user(uid)).await
    }

    // == Schools ==
    pub async fn cache_school<T: Serialize>(&self, id: &str, school: &T) -> bool {
        self.put(keys::school(id), school, keys::SCHOOL_TTL).await
    }

    pub async fn get_cached_school<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        self.fetch(keys::school(id)).await
    }

    pub async fn invalidate_school(&self, id: &str) -> bool {
        self.drop_key(keys::school(id)).await
    }

    // == Clubs ==
    /// Caches the club list of a school.
    pub async fn cache_clubs<T: Serialize>(&self, school_id: &str, clubs: &T) -> bool {
        self.put(keys::clubs(school_id), clubs, keys::CLUBS_TTL).await
    }

    pub async fn get_cached_clubs<T: DeserializeOwned>(&self, school_id: &str) -> Option<T> {
        self.fetch(keys::clubs(school_id)).await
    }

    pub async fn invalidate_clubs(&self, school_id: &str) -> bool {
        self.drop_key(keys::clubs(school_id)).await
    }

    // == Events ==
    /// Caches the events of a club for five minutes.
    pub async fn cache_events<T: Serialize>(&self, club_id: &str, events: &T) -> bool {
        self.put(keys::events(club_id), events, keys::EVENTS_TTL).await
    }

    /// Same key as `cache_events` with a three minute TTL, for listings that
    /// change often (upcoming events).
    pub async fn cache_events_briefly<T: Serialize>(&self, club_id: &str, events: &T) -> bool {
        self.put(keys::events(club_id), events, keys::EVENTS_SHORT_TTL)
            .await
    }

    pub async fn get_cached_events<T: DeserializeOwned>(&self, club_id: &str) -> Option<T> {
        self.fetch(keys::events(club_id)).await
    }

    pub async fn invalidate_events(&self, club_id: &str) -> bool {
        self.drop_key(keys::events(club_id)).await
    }

    // == Tags ==
    pub async fn cache_tags<S: AsRef<str>, T: Serialize>(&self, ids: &[S], tags: &T) -> bool {
        self.put(keys::tags(ids), tags, keys::TAGS_TTL).await
    }

    pub async fn get_cached_tags<S: AsRef<str>, T: DeserializeOwned>(
        &self,
        ids: &[S],
    ) -> Option<T> {
        self.fetch(keys::tags(ids)).await
    }

    // == Join Requests ==
    pub async fn cache_join_requests<T: Serialize>(&self, club_id: &str, requests: &T) -> bool {
        self.put(
            keys::join_requests(club_id),
            requests,
            keys::JOIN_REQUESTS_TTL,
        )
        .await
    }

    pub async fn get_cached_join_requests<T: DeserializeOwned>(&self, club_id: &str) -> Option<T> {
        self.fetch(keys::join_requests(club_id)).await
    }

    pub async fn cache_school_join_requests<T: Serialize>(
        &self,
        school_id: &str,
        requests: &T,
    ) -> bool {
        self.put(
            keys::school_join_requests(school_id),
            requests,
            keys::JOIN_REQUESTS_TTL,
        )
        .await
    }

    pub async fn get_cached_school_join_requests<T: DeserializeOwned>(
        &self,
        school_id: &str,
    ) -> Option<T> {
        self.fetch(keys::school_join_requests(school_id)).await
    }

    /// Drops both the club's and the school's pending request lists.
    pub async fn invalidate_join_requests(&self, club_id: &str, school_id: &str) {
        self.drop_key(keys::join_requests(club_id)).await;
        self.drop_key(keys::school_join_requests(school_id)).await;
    }

    // == Dashboard Stats ==
    pub async fn cache_dashboard_stats<T: Serialize>(&self, school_id: &str, stats: &T) -> bool {
        self.put(
            keys::dashboard_stats(school_id),
            stats,
            keys::DASHBOARD_STATS_TTL,
        )
        .await
    }

    pub async fn get_cached_dashboard_stats<T: DeserializeOwned>(
        &self,
        school_id: &str,
    ) -> Option<T> {
        self.fetch(keys::dashboard_stats(school_id)).await
    }

    // == Tutoring ==
    pub async fn cache_user_data<T: Serialize>(&self, uid: &str, data: &T) -> bool {
        self.put(keys::user_data(uid), data, keys::TUTORING_TTL).await
    }

    pub async fn get_cached_user_data<T: DeserializeOwned>(&self, uid: &str) -> Option<T> {
        self.fetch(keys::user_data(uid)).await
    }

    pub async fn cache_user_preferences<T: Serialize>(&self, uid: &str, prefs: &T) -> bool {
        self.put(keys::user_preferences(uid), prefs, keys::USER_TTL)
            .await
    }

    pub async fn get_cached_user_preferences<T: DeserializeOwned>(&self, uid: &str) -> Option<T> {
        self.fetch(keys::user_preferences(uid)).await
    }

    pub async fn cache_mathlab_requests<T: Serialize>(&self, uid: &str, requests: &T) -> bool {
        self.put(keys::mathlab_requests(uid), requests, keys::TUTORING_TTL)
            .await
    }

    pub async fn get_cached_mathlab_requests<T: DeserializeOwned>(&self, uid: &str) -> Option<T> {
        self.fetch(keys::mathlab_requests(uid)).await
    }

    pub async fn cache_mathlab_sessions<T: Serialize>(&self, uid: &str, sessions: &T) -> bool {
        self.put(keys::mathlab_sessions(uid), sessions, keys::TUTORING_TTL)
            .await
    }

    pub async fn get_cached_mathlab_sessions<T: DeserializeOwned>(&self, uid: &str) -> Option<T> {
        self.fetch(keys::mathlab_sessions(uid)).await
    }

    // == Generic ==
    /// Removes every entry of a namespace, e.g. `"clubs"`.
    pub async fn invalidate_namespace(&self, namespace: &str) -> usize {
        let removed = self.store.write().await.invalidate_namespace(namespace);
        debug!("Invalidated {} '{}' entries", removed, namespace);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, ManualClock, MemoryBackend};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Club {
        id: String,
        name: String,
    }

    fn clubs() -> Vec<Club> {
        vec![
            Club {
                id: "c1".to_string(),
                name: "Chess".to_string(),
            },
            Club {
                id: "c2".to_string(),
                name: "Robotics".to_string(),
            },
        ]
    }

    fn domain_with_clock() -> (DomainCache, ManualClock) {
        let clock = ManualClock::new(0);
        let store = CacheStore::new(100, 300)
            .with_clock(Arc::new(clock.clone()))
            .into_shared();
        (DomainCache::new(store), clock)
    }

    #[tokio::test]
    async fn test_clubs_round_trip_through_facade() {
        let (domain, _) = domain_with_clock();

        assert!(domain.get_cached_clubs::<Vec<Club>>("s1").await.is_none());
        assert!(domain.cache_clubs("s1", &clubs()).await);

        let cached: Option<Vec<Club>> = domain.get_cached_clubs("s1").await;
        assert_eq!(cached, Some(clubs()));
        assert!(domain.store().read().await.keys().contains(&"clubs:s1".to_string()));
    }

    #[tokio::test]
    async fn test_facade_ttls() {
        let (domain, clock) = domain_with_clock();

        domain.cache_user("u1", &"Ada").await;
        domain.cache_school("s1", &"Lincoln").await;
        domain.cache_join_requests("c1", &Vec::<String>::new()).await;

        clock.advance_secs(121);
        assert!(domain.get_cached_join_requests::<Vec<String>>("c1").await.is_none());
        assert!(domain.get_cached_user::<String>("u1").await.is_some());

        clock.advance_secs(1800 - 121);
        assert!(domain.get_cached_user::<String>("u1").await.is_none());
        assert!(domain.get_cached_school::<String>("s1").await.is_some());

        clock.advance_secs(1800);
        assert!(domain.get_cached_school::<String>("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_events_short_variant() {
        let (domain, clock) = domain_with_clock();

        domain.cache_events_briefly("c1", &vec!["bake sale"]).await;
        clock.advance_secs(181);
        assert!(domain.get_cached_events::<Vec<String>>("c1").await.is_none());

        domain.cache_events("c1", &vec!["bake sale"]).await;
        clock.advance_secs(181);
        assert!(domain.get_cached_events::<Vec<String>>("c1").await.is_some());
    }

    #[tokio::test]
    async fn test_tags_lookup_ignores_id_order() {
        let (domain, _) = domain_with_clock();

        domain.cache_tags(&["b", "a"], &vec!["math", "art"]).await;

        let cached: Option<Vec<String>> = domain.get_cached_tags(&["a", "b"]).await;
        assert_eq!(cached, Some(vec!["math".to_string(), "art".to_string()]));
    }

    #[tokio::test]
    async fn test_wrong_type_is_a_miss() {
        let (domain, _) = domain_with_clock();

        domain.cache_dashboard_stats("s1", &"not a number").await;

        assert!(domain.get_cached_dashboard_stats::<u64>("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_join_requests_clears_both_lists() {
        let (domain, _) = domain_with_clock();

        domain.cache_join_requests("c1", &vec![1]).await;
        domain.cache_school_join_requests("s1", &vec![1]).await;
        domain.invalidate_join_requests("c1", "s1").await;

        assert!(domain.get_cached_join_requests::<Vec<u8>>("c1").await.is_none());
        assert!(domain
            .get_cached_school_join_requests::<Vec<u8>>("s1")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_invalidate_namespace_leaves_other_types() {
        let (domain, _) = domain_with_clock();

        domain.cache_user("1", &"a").await;
        domain.cache_user("10", &"b").await;
        domain.cache_user_data("1", &"c").await;

        assert_eq!(domain.invalidate_namespace(keys::USER).await, 2);
        assert!(domain.get_cached_user_data::<String>("1").await.is_some());
    }

    #[test]
    fn test_failed_medium_write_degrades_to_miss() {
        let backend = Arc::new(MemoryBackend::with_quota(16));
        let store = CacheStore::new(100, 300).with_backend(backend).into_shared();
        let domain = DomainCache::new(store);

        tokio_test::block_on(async {
            assert!(!domain.cache_school("s1", &clubs()).await);
            assert!(domain.get_cached_school::<Vec<Club>>("s1").await.is_none());
        });
    }
}
