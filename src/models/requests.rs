//! Request DTOs for the cache administration API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::RequestOptions;

/// Request body for POST /cache/refresh
///
/// # Fields
/// - `endpoint`: The upstream endpoint to refetch, e.g. `/api/product/get`
/// - `method`: HTTP method of the cached request (default GET)
/// - `body`: JSON body of the cached request, if any
/// - `headers`: Headers of the cached request, if any
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub endpoint: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RefreshRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.endpoint.trim().is_empty() {
            return Some("Endpoint cannot be empty".to_string());
        }
        None
    }

    /// Options identifying the cached request.
    pub fn options(&self) -> RequestOptions {
        RequestOptions {
            method: self.method.clone().unwrap_or_else(|| "GET".to_string()),
            body: self.body.clone(),
            headers: self.headers.clone(),
            ..RequestOptions::default()
        }
    }
}

/// Request body for POST /cache/invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Substring matched against cache keys
    pub pattern: String,
}

impl InvalidateRequest {
    /// An empty pattern would match every key; clearing is its own endpoint.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}
