//! API Handlers
//!
//! HTTP request handlers for the cache admin and monitoring endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{
    CacheKey, CacheStats, DetailedStats, PerformanceMetrics, SharedStore, SizeByType,
};
use crate::context::CacheContext;
use crate::error::{CacheError, Result};
use crate::invalidation::{InvalidationManager, InvalidationReport};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, InvalidateRequest,
    NamespaceResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// Holds handles into one cache context; the context itself stays with the
/// caller so it can be shut down.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The context's store
    pub cache: SharedStore,
    /// The context's invalidation manager
    pub invalidation: InvalidationManager,
}

impl AppState {
    pub fn new(cache: SharedStore, invalidation: InvalidationManager) -> Self {
        Self {
            cache,
            invalidation,
        }
    }

    pub fn from_context(context: &CacheContext) -> Self {
        Self::new(context.store().clone(), context.invalidation().clone())
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = CacheKey::parse(&req.key);
    let mut cache = state.cache.write().await;
    if let Err(err) = cache.try_set(&key, req.value, req.ttl) {
        // Same outcome as a dropped write, but the caller gets the reason
        cache.drop_write(&key, &err);
        return Err(err);
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Write lock: reads bump the access rank and counters
    let mut cache = state.cache.write().await;
    let value = cache.lookup(&CacheKey::parse(&key))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.write().await.delete(key.as_str());
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for DELETE /namespace/:namespace
pub async fn invalidate_namespace_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Json<NamespaceResponse> {
    let removed = state.cache.write().await.invalidate_namespace(&namespace);
    Json(NamespaceResponse { namespace, removed })
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Json<InvalidationReport> {
    let report = state
        .invalidation
        .invalidate_on_data_change(req.data_type.as_str(), req.change_type.as_str())
        .await;
    Json(report)
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let mut cache = state.cache.write().await;
    let removed = cache.len();
    cache.clear();
    Json(ClearResponse {
        message: "Cache cleared".to_string(),
        removed,
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.read().await.stats())
}

/// Handler for GET /stats/detailed
pub async fn detailed_stats_handler(State(state): State<AppState>) -> Json<DetailedStats> {
    Json(state.cache.read().await.detailed_stats())
}

/// Handler for GET /stats/performance
pub async fn performance_handler(State(state): State<AppState>) -> Json<PerformanceMetrics> {
    Json(state.cache.read().await.performance_metrics())
}

/// Handler for GET /stats/by-type
pub async fn size_by_type_handler(State(state): State<AppState>) -> Json<SizeByType> {
    Json(state.cache.read().await.size_by_type())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::{CacheStore, MemoryBackend};
    use crate::invalidation::InvalidationBus;
    use serde_json::json;

    fn test_state() -> AppState {
        let cache = CacheStore::new(100, 300).into_shared();
        let invalidation = InvalidationManager::new(cache.clone(), InvalidationBus::new(8));
        AppState::new(cache, invalidation)
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "user:1".to_string(),
            value: json!({"name": "Ada"}),
            ttl: None,
        };
        assert!(set_handler(State(state.clone()), Json(req)).await.is_ok());

        let response = get_handler(State(state), Path("user:1".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler_is_idempotent() {
        let state = test_state();
        state
            .cache
            .write()
            .await
            .set("school:1", json!("Lincoln"), None);

        let first = delete_handler(State(state.clone()), Path("school:1".to_string())).await;
        let second = delete_handler(State(state), Path("school:1".to_string())).await;

        assert!(first.deleted);
        assert!(!second.deleted);
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = test_state();
        state
            .cache
            .write()
            .await
            .set("mathlabSessions:u1", json!([]), None);

        let req = InvalidateRequest {
            data_type: "tutoring_session".to_string(),
            change_type: "end".to_string(),
        };
        let report = invalidate_handler(State(state.clone()), Json(req)).await;

        assert_eq!(report.removed, 1);
        assert!(state.cache.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let req = SetRequest {
            key: "".to_string(),
            value: json!("value"),
            ttl: None,
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_set_over_quota_counts_dropped_write() {
        let cache = CacheStore::new(100, 300)
            .with_backend(Arc::new(MemoryBackend::with_quota(200)))
            .into_shared();
        let invalidation = InvalidationManager::new(cache.clone(), InvalidationBus::new(8));
        let state = AppState::new(cache, invalidation);

        let small = SetRequest {
            key: "user:1".to_string(),
            value: json!("small"),
            ttl: None,
        };
        assert!(set_handler(State(state.clone()), Json(small)).await.is_ok());

        let large = SetRequest {
            key: "user:1".to_string(),
            value: json!("x".repeat(500)),
            ttl: None,
        };
        let result = set_handler(State(state.clone()), Json(large)).await;
        assert!(matches!(result, Err(CacheError::QuotaExceeded { .. })));

        let metrics = performance_handler(State(state.clone())).await;
        assert_eq!(metrics.dropped_writes, 1);
        assert!(!state.cache.read().await.contains(&CacheKey::parse("user:1")));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
