//! API Handlers
//!
//! HTTP request handlers for the caching proxy and cache administration.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::COOKIE, HeaderMap, Method, Uri},
    Json,
};
use serde_json::Value;

use crate::cache::{Credentials, RequestOptions};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, HealthResponse, InvalidateRequest, InvalidateResponse, PreloadResponse,
    RefreshRequest, StatsResponse,
};
use crate::service::CacheService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide cache
    pub service: Arc<CacheService>,
}

impl AppState {
    /// Creates a new AppState around an existing service.
    pub fn new(service: CacheService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheService::from_config(config)?))
    }
}

/// Handler for ANY /api/*path
///
/// Serves the upstream response for the same path and query through the
/// cache. The JSON body, if any, is part of the cache key.
///
/// The client's own `Cookie` header is forwarded and keys the entry; the
/// fetcher's cookie jar is never used for proxied requests.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let endpoint = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let body = if body.is_empty() {
        None
    } else {
        let parsed = serde_json::from_slice::<Value>(&body)
            .map_err(|e| CacheError::InvalidRequest(format!("Body is not valid JSON: {}", e)))?;
        Some(parsed)
    };

    let mut options = RequestOptions {
        method: method.as_str().to_string(),
        body,
        credentials: Credentials::Omit,
        ..RequestOptions::default()
    };
    if let Some(cookie) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        options = options.with_header(COOKIE.as_str(), cookie);
    }

    let data = state.service.request(endpoint, options).await?;
    Ok(Json(data))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.service.get_stats().await))
}

/// Handler for POST /cache/refresh
///
/// Drops the cached copy of one request and fetches it again.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<Value>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let data = state
        .service
        .refresh_cache(&req.endpoint, req.options())
        .await?;
    Ok(Json(data))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.service.invalidate_cache(&req.pattern).await;
    Ok(Json(InvalidateResponse::new(req.pattern, removed)))
}

/// Handler for POST /cache/preload
pub async fn preload_handler(State(state): State<AppState>) -> Json<PreloadResponse> {
    let succeeded = state.service.preload_critical_data().await;
    Json(PreloadResponse {
        requested: state.service.preload_endpoints().len(),
        succeeded,
    })
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.service.clear_all_caches().await;
    Json(ClearResponse::cleared())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FetchResult, MemoryStorage};
    use crate::error::FetchError;
    use crate::fetcher::Fetcher;
    use futures::future::{BoxFuture, FutureExt};
    use serde_json::json;

    /// Answers every endpoint with its own path, except `/api/down`.
    #[derive(Debug)]
    struct EchoFetcher;

    impl Fetcher for EchoFetcher {
        fn fetch_remote(
            &self,
            endpoint: &str,
            options: &RequestOptions,
        ) -> BoxFuture<'static, FetchResult> {
            let result = if endpoint.starts_with("/api/down") {
                Err(FetchError::Status {
                    status: 500,
                    status_text: "Internal Server Error".to_string(),
                })
            } else {
                Ok(json!({
                    "endpoint": endpoint,
                    "method": options.method(),
                    "body": options.body,
                    "cookie": options.headers.get("cookie"),
                    "credentials": options.credentials
                }))
            };
            async move { result }.boxed()
        }
    }

    fn test_state() -> AppState {
        AppState::new(CacheService::new(
            Arc::new(EchoFetcher),
            Arc::new(MemoryStorage::new()),
        ))
    }

    #[tokio::test]
    async fn test_proxy_handler_get() {
        let state = test_state();

        let response = proxy_handler(
            State(state.clone()),
            Method::GET,
            Uri::from_static("/api/product/get?page=2"),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await
        .unwrap();

        assert_eq!(response.0["endpoint"], json!("/api/product/get?page=2"));
        assert_eq!(state.service.get_stats().await.requests, 1);
    }

    #[tokio::test]
    async fn test_proxy_handler_post_body() {
        let response = proxy_handler(
            State(test_state()),
            Method::POST,
            Uri::from_static("/api/search"),
            HeaderMap::new(),
            Bytes::from_static(br#"{"query":"tea"}"#),
        )
        .await
        .unwrap();

        assert_eq!(response.0["method"], json!("POST"));
        assert_eq!(response.0["body"], json!({"query": "tea"}));
    }

    #[tokio::test]
    async fn test_proxy_handler_invalid_body() {
        let result = proxy_handler(
            State(test_state()),
            Method::POST,
            Uri::from_static("/api/search"),
            HeaderMap::new(),
            Bytes::from_static(b"{oops"),
        )
        .await;

        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_proxy_handler_upstream_error() {
        let result = proxy_handler(
            State(test_state()),
            Method::GET,
            Uri::from_static("/api/down"),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await;

        assert!(matches!(result, Err(CacheError::Fetch(FetchError::Status { status: 500, .. }))));
    }

    #[tokio::test]
    async fn test_proxy_handler_forwards_client_cookie_only() {
        let state = test_state();

        let anonymous = proxy_handler(
            State(state.clone()),
            Method::GET,
            Uri::from_static("/api/user/me"),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await
        .unwrap();
        assert_eq!(anonymous.0["cookie"], Value::Null);
        assert_eq!(anonymous.0["credentials"], json!("omit"));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "session=bob".parse().unwrap());
        let bob = proxy_handler(
            State(state.clone()),
            Method::GET,
            Uri::from_static("/api/user/me"),
            headers,
            Bytes::new(),
        )
        .await
        .unwrap();
        assert_eq!(bob.0["cookie"], json!("session=bob"));

        // Different sessions never share a cache entry
        assert_eq!(state.service.get_stats().await.memory_cache_size, 2);
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = test_state();
        state
            .service
            .request("/api/cart/items", RequestOptions::get())
            .await
            .unwrap();

        let req = InvalidateRequest {
            pattern: "/api/cart".to_string(),
        };
        let response = invalidate_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(response.removed, 1);

        let empty = InvalidateRequest {
            pattern: String::new(),
        };
        assert!(invalidate_handler(State(state), Json(empty)).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_handler_rejects_empty_endpoint() {
        let req = RefreshRequest {
            endpoint: String::new(),
            method: None,
            body: None,
            headers: Default::default(),
        };
        let result = refresh_handler(State(test_state()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_and_stats_handlers() {
        let state = test_state();
        state
            .service
            .request("/api/category/get", RequestOptions::get())
            .await
            .unwrap();

        let response = stats_handler(State(state.clone())).await;
        assert_eq!(response.stats.memory_cache_size, 1);

        clear_handler(State(state.clone())).await;
        let response = stats_handler(State(state)).await;
        assert_eq!(response.stats.memory_cache_size, 0);
        assert_eq!(response.stats.requests, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
