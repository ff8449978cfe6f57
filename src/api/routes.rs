//! API Routes
//!
//! Configures the Axum router with all cache admin endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, detailed_stats_handler, get_handler, health_handler,
    invalidate_handler, invalidate_namespace_handler, performance_handler, set_handler,
    size_by_type_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a value
/// - `GET /get/:key` - Retrieve a value by key
/// - `DELETE /del/:key` - Delete a key
/// - `DELETE /namespace/:namespace` - Delete every key of a namespace
/// - `POST /invalidate` - Report a data change
/// - `POST /clear` - Empty the cache
/// - `GET /stats`, `/stats/detailed`, `/stats/performance`, `/stats/by-type`
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (the dashboard is served elsewhere)
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/namespace/:namespace", delete(invalidate_namespace_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/clear", post(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/detailed", get(detailed_stats_handler))
        .route("/stats/performance", get(performance_handler))
        .route("/stats/by-type", get(size_by_type_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::invalidation::{InvalidationBus, InvalidationManager};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let cache = CacheStore::new(100, 300).into_shared();
        let invalidation = InvalidationManager::new(cache.clone(), InvalidationBus::new(8));
        create_router(AppState::new(cache, invalidation))
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        create_test_app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoints() {
        for uri in ["/stats", "/stats/detailed", "/stats/performance", "/stats/by-type"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            assert_eq!(status_of(request).await, StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let request = Request::builder()
            .uri("/get/user:nobody")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let request = Request::builder()
            .method("DELETE")
            .uri("/del/user:nobody")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }
}
