//! Response DTOs for the cache administration API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    /// When the snapshot was taken, ISO 8601
    pub generated_at: String,
}

impl StatsResponse {
    pub fn new(stats: StatsSnapshot) -> Self {
        Self {
            stats,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for POST /cache/invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub message: String,
    pub pattern: String,
    /// Entries removed across both tiers
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(pattern: impl Into<String>, removed: usize) -> Self {
        let pattern = pattern.into();
        Self {
            message: format!("Invalidated {} entries matching '{}'", removed, pattern),
            pattern,
            removed,
        }
    }
}

/// Response body for POST /cache/preload
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    pub requested: usize,
    pub succeeded: usize,
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "All caches cleared".to_string(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
