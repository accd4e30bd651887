//! Configuration Module
//!
//! Handles loading and managing cache proxy configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Endpoints warmed by `preload_critical_data` when `PRELOAD_ENDPOINTS` is unset.
pub const DEFAULT_PRELOAD_ENDPOINTS: &[&str] = &["/api/category/get", "/api/product/get"];

/// Cache proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream JSON API
    pub api_base_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Eviction sweep interval in seconds
    pub cleanup_interval: u64,
    /// Default upstream request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Directory holding the durable cache record
    pub cache_dir: PathBuf,
    /// Endpoints fetched by the preload operation
    pub preload_endpoints: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Upstream API base URL (default: http://localhost:4000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `REQUEST_TIMEOUT_MS` - Upstream timeout in milliseconds (default: 10000)
    /// - `CACHE_DIR` - Durable cache directory (default: .cache)
    /// - `PRELOAD_ENDPOINTS` - Comma separated endpoint list
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_base_url: env::var("API_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.cleanup_interval),
            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.request_timeout_ms),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            preload_endpoints: env::var("PRELOAD_ENDPOINTS")
                .ok()
                .map(|v| split_endpoints(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.preload_endpoints),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000".to_string(),
            server_port: 3000,
            cleanup_interval: 60,
            request_timeout_ms: 10_000,
            cache_dir: PathBuf::from(".cache"),
            preload_endpoints: DEFAULT_PRELOAD_ENDPOINTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn split_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect()
}
