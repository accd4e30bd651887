//! Storefront Cache - A client-side response cache for a storefront API
//!
//! Two-tier caching with per-endpoint strategies, LRU size limits, request
//! deduplication, stale fallback and durable persistence, served as an
//! HTTP caching proxy.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod service;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use service::CacheService;
pub use tasks::spawn_cleanup_task;
