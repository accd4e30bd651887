//! API Routes
//!
//! Configures the Axum router with the proxy and cache administration endpoints.

use axum::{
    routing::{any, delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, invalidate_handler, preload_handler, proxy_handler,
    refresh_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `ANY /api/*path` - Cached proxy to the upstream API
/// - `GET /cache/stats` - Cache statistics
/// - `POST /cache/refresh` - Refetch one cached request
/// - `POST /cache/invalidate` - Drop keys matching a pattern
/// - `POST /cache/preload` - Warm the critical endpoints
/// - `DELETE /cache` - Clear every tier
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/*path", any(proxy_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/refresh", post(refresh_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/preload", post(preload_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FetchResult, MemoryStorage, RequestOptions};
    use crate::fetcher::Fetcher;
    use crate::service::CacheService;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use futures::future::{BoxFuture, FutureExt};
    use serde_json::json;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    #[derive(Debug)]
    struct OkFetcher;

    impl Fetcher for OkFetcher {
        fn fetch_remote(
            &self,
            _endpoint: &str,
            _options: &RequestOptions,
        ) -> BoxFuture<'static, FetchResult> {
            async { Ok(json!({"ok": true})) }.boxed()
        }
    }

    fn create_test_app() -> Router {
        let service = CacheService::new(Arc::new(OkFetcher), Arc::new(MemoryStorage::new()));
        create_router(AppState::new(service))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_proxy_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/product/get")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalidate_bad_request() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache/invalidate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"pattern":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_not_found() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nowhere")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
