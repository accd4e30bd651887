//! Cache Service Module
//!
//! The facade storefront callers go through: strategy resolution, two-tier
//! lookup, deduplicated fetching, stale fallback and cache administration.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{
    make_key, report_swallowed, CacheStore, Clock, DurableStorage, FileStorage, Lookup,
    RequestDeduplicator, RequestOptions, StatsSnapshot, StrategyTable, SweepReport, SystemClock,
};
use crate::config::{Config, DEFAULT_PRELOAD_ENDPOINTS};
use crate::error::Result;
use crate::fetcher::{Fetcher, HttpFetcher};

// == Cache Service ==
/// One cache per process, shared as `Arc<CacheService>`.
#[derive(Debug)]
pub struct CacheService {
    store: Mutex<CacheStore>,
    dedup: RequestDeduplicator,
    fetcher: Arc<dyn Fetcher>,
    strategies: Arc<StrategyTable>,
    preload_endpoints: Vec<String>,
}

impl CacheService {
    // == Constructors ==
    /// Service with the built-in strategy table and the system clock.
    pub fn new(fetcher: Arc<dyn Fetcher>, storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_parts(
            fetcher,
            storage,
            Arc::new(StrategyTable::builtin()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<dyn DurableStorage>,
        strategies: Arc<StrategyTable>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = CacheStore::new(Arc::clone(&strategies), storage, clock);
        Self {
            store: Mutex::new(store),
            dedup: RequestDeduplicator::new(),
            fetcher,
            strategies,
            preload_endpoints: DEFAULT_PRELOAD_ENDPOINTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    /// HTTP fetcher against `API_BASE_URL` and file storage under `CACHE_DIR`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(
            &config.api_base_url,
            Duration::from_millis(config.request_timeout_ms),
        )?;
        let storage = FileStorage::new(config.cache_dir.clone());

        Ok(Self::new(Arc::new(fetcher), Arc::new(storage))
            .with_preload_endpoints(config.preload_endpoints.clone()))
    }

    pub fn with_preload_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.preload_endpoints = endpoints;
        self
    }

    // == Request ==
    /// Returns the response for `endpoint`, from cache when fresh.
    ///
    /// Concurrent identical requests share one upstream call. When the
    /// upstream fails, stale data from either tier is returned instead of
    /// the error if there is any.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let strategy = self.strategies.resolve(endpoint);
        let key = make_key(endpoint, &options);

        let stale = {
            let mut store = self.store.lock().await;
            store.record_request();
            match store.lookup(&key, strategy) {
                Lookup::Fresh(data) => {
                    debug!("Cache hit ({}): {}", strategy.name, key);
                    return Ok(data);
                }
                Lookup::Stale(data) => Some(data),
                Lookup::Miss => None,
            }
        };
        debug!("Cache miss ({}): {}", strategy.name, key);

        let fetcher = Arc::clone(&self.fetcher);
        let result = self
            .dedup
            .dedupe(&key, || fetcher.fetch_remote(endpoint, &options))
            .await;

        let mut store = self.store.lock().await;
        match result {
            Ok(data) => {
                store.set(key, data.clone(), strategy);
                Ok(data)
            }
            Err(err) => match stale.or_else(|| store.get_stale(&key)) {
                Some(data) => {
                    report_swallowed("request", &err);
                    Ok(data)
                }
                None => Err(err.into()),
            },
        }
    }

    // == Refresh Cache ==
    /// Drops any cached copy and fetches again.
    pub async fn refresh_cache(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let key = make_key(endpoint, &options);
        self.store.lock().await.remove(&key);
        self.request(endpoint, options).await
    }

    // == Invalidate Cache ==
    /// Deletes every cached key containing `pattern`. Returns the number of
    /// entries removed across both tiers.
    pub async fn invalidate_cache(&self, pattern: &str) -> usize {
        let removed = self.store.lock().await.invalidate_matching(pattern);
        info!("Invalidated {} cache entries matching {:?}", removed, pattern);
        removed
    }

    // == Preload ==
    /// Requests every preload endpoint concurrently. Failures are logged,
    /// never returned. Returns how many succeeded.
    pub async fn preload_critical_data(&self) -> usize {
        let requests = self
            .preload_endpoints
            .iter()
            .map(|endpoint| self.request(endpoint, RequestOptions::get()));
        let results = join_all(requests).await;

        let mut succeeded = 0;
        for (endpoint, result) in self.preload_endpoints.iter().zip(results) {
            match result {
                Ok(_) => succeeded += 1,
                Err(err) => warn!("Preload of {} failed: {}", endpoint, err),
            }
        }
        info!(
            "Preloaded {}/{} critical endpoints",
            succeeded,
            self.preload_endpoints.len()
        );
        succeeded
    }

    pub fn preload_endpoints(&self) -> &[String] {
        &self.preload_endpoints
    }

    // == Stats ==
    pub async fn get_stats(&self) -> StatsSnapshot {
        let store = self.store.lock().await;
        StatsSnapshot::new(
            &store.stats(),
            store.memory_len(),
            store.persistent_len(),
            self.strategies.strategies(),
        )
    }

    // == Sweep ==
    /// Runs one eviction pass. Never fails: an internal error resets the
    /// whole cache instead, and `None` is returned.
    pub async fn sweep(&self) -> Option<SweepReport> {
        let mut store = self.store.lock().await;
        match store.sweep() {
            Ok(report) => Some(report),
            Err(err) => {
                report_swallowed("sweep", &err);
                warn!("Sweep failed, performing emergency cache reset");
                store.clear();
                None
            }
        }
    }

    // == Clear ==
    /// Wipes both tiers, the durable record and the statistics.
    pub async fn clear_all_caches(&self) {
        self.store.lock().await.clear();
        info!("All caches cleared");
    }

    /// Same wipe as [`clear_all_caches`](Self::clear_all_caches), logged as
    /// a recovery action.
    pub async fn emergency_reset(&self) {
        warn!("Emergency cache reset");
        self.store.lock().await.clear();
    }

    // == Storefront Wrappers ==
    pub async fn get_products(&self) -> Result<Value> {
        self.request("/api/product/get", RequestOptions::get()).await
    }

    pub async fn get_product(&self, id: &str) -> Result<Value> {
        self.request(&format!("/api/product/get/{}", id), RequestOptions::get())
            .await
    }

    pub async fn get_categories(&self) -> Result<Value> {
        self.request("/api/category/get", RequestOptions::get()).await
    }

    pub async fn search_products(&self, query: &str) -> Result<Value> {
        self.request("/api/search", RequestOptions::post(json!({ "query": query })))
            .await
    }
}
