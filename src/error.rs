//! Error types for the storefront cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Fetch Error Enum ==
/// Failure of an upstream network call.
///
/// `Clone` because one in-flight fetch is shared by every deduplicated caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete before its deadline and was aborted
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Upstream answered with a non-2xx status
    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },

    /// Connection failure, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not valid JSON
    #[error("Invalid JSON response: {0}")]
    Decode(String),

    /// Endpoint, method or header could not form a valid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == Storage Error Enum ==
/// Failure of the durable storage backing the persistent tier.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record parsed as JSON but does not have the expected shape
    #[error("Corrupt storage record: {0}")]
    Corrupt(String),

    #[error("Unsupported storage record version: {0}")]
    UnsupportedVersion(u64),
}

// == Cache Error Enum ==
/// Unified error type for the cache service.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Upstream fetch failed and no stale data was available
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Durable storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cache-internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Fetch(FetchError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            // Upstream client errors pass through, everything else is a bad gateway
            CacheError::Fetch(FetchError::Status { status, .. }) => StatusCode::from_u16(*status)
                .ok()
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_GATEWAY),
            CacheError::Fetch(FetchError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage(_) | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache service.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status {
            status: 503,
            status_text: "Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");

        let err = FetchError::Timeout { timeout_ms: 10_000 };
        assert!(err.to_string().contains("10000ms"));
    }

    #[test]
    fn test_status_mapping() {
        let timeout: CacheError = FetchError::Timeout { timeout_ms: 1 }.into();
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);

        let not_found: CacheError = FetchError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
        }
        .into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let upstream_down: CacheError = FetchError::Status {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        }
        .into();
        assert_eq!(upstream_down.into_response().status(), StatusCode::BAD_GATEWAY);

        let bad = CacheError::InvalidRequest("body".to_string());
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
