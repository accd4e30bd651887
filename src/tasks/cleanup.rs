//! Eviction Sweep Task
//!
//! Background task that periodically removes expired cache entries from both
//! tiers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::service::CacheService;

/// Spawns a background task that sweeps the cache every interval.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. A sweep never fails from the task's point of view: the
/// service resets itself when a sweep hits an internal error.
///
/// # Arguments
/// * `service` - Shared cache service
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let service = Arc::new(CacheService::from_config(&config)?);
/// let cleanup_handle = spawn_cleanup_task(service.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    service: Arc<CacheService>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            match service.sweep().await {
                Some(report) if report.total() > 0 => info!(
                    "Cache sweep: removed {} memory and {} persistent entries",
                    report.memory_removed, report.persistent_removed
                ),
                Some(_) => debug!("Cache sweep: no expired entries found"),
                None => warn!("Cache sweep failed, cache was reset"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FetchResult, ManualClock, MemoryStorage, RequestOptions, StrategyTable};
    use crate::fetcher::Fetcher;
    use futures::future::{BoxFuture, FutureExt};
    use serde_json::json;

    #[derive(Debug)]
    struct StaticFetcher;

    impl Fetcher for StaticFetcher {
        fn fetch_remote(
            &self,
            _endpoint: &str,
            _options: &RequestOptions,
        ) -> BoxFuture<'static, FetchResult> {
            async { Ok(json!({"ok": true})) }.boxed()
        }
    }

    fn test_service(clock: &ManualClock) -> Arc<CacheService> {
        Arc::new(CacheService::with_parts(
            Arc::new(StaticFetcher),
            Arc::new(MemoryStorage::new()),
            Arc::new(StrategyTable::builtin()),
            Arc::new(clock.clone()),
        ))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = ManualClock::new(1_000_000);
        let service = test_service(&clock);

        // Cart entries live for 30 seconds
        service.request("/api/cart", RequestOptions::get()).await.unwrap();
        clock.advance(30_001);

        // Spawn cleanup task with 1 second interval
        let handle = spawn_cleanup_task(service.clone(), 1);

        // Wait for the sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let stats = service.get_stats().await;
        assert_eq!(stats.memory_cache_size, 0, "Expired entry should have been swept");
        assert_eq!(stats.last_cleanup_at, Some(1_030_001));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let clock = ManualClock::new(1_000_000);
        let service = test_service(&clock);

        service
            .request("/api/category/get", RequestOptions::get())
            .await
            .unwrap();

        let handle = spawn_cleanup_task(service.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let stats = service.get_stats().await;
        assert_eq!(stats.memory_cache_size, 1, "Valid entry should not be removed");
        assert_eq!(stats.persistent_cache_size, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let clock = ManualClock::new(0);
        let handle = spawn_cleanup_task(test_service(&clock), 1);

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
