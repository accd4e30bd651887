//! Cache Statistics Module
//!
//! Tracks cache performance metrics: hits, misses, facade requests and the
//! time of the last sweep.

use serde::Serialize;

use crate::cache::CacheStrategy;

// == Cache Stats ==
/// Monotonic counters, reset only by a full clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of fresh reads served from either tier
    pub hits: u64,
    /// Number of reads that found nothing fresh in either tier
    pub misses: u64,
    /// Number of facade `request` calls
    pub requests: u64,
    /// Time of the last completed sweep (Unix milliseconds)
    pub last_cleanup_at: Option<u64>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    pub fn record_cleanup(&mut self, now: u64) {
        self.last_cleanup_at = Some(now);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Stats Snapshot ==
/// Point-in-time view returned by `CacheService::get_stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub requests: u64,
    pub hit_rate: f64,
    pub memory_cache_size: usize,
    pub persistent_cache_size: usize,
    pub last_cleanup_at: Option<u64>,
    pub strategies: Vec<CacheStrategy>,
}

impl StatsSnapshot {
    pub fn new(
        stats: &CacheStats,
        memory_cache_size: usize,
        persistent_cache_size: usize,
        strategies: Vec<CacheStrategy>,
    ) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            requests: stats.requests,
            hit_rate: stats.hit_rate(),
            memory_cache_size,
            persistent_cache_size,
            last_cleanup_at: stats.last_cleanup_at,
            strategies,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.requests, 0);
        assert!(stats.last_cleanup_at.is_none());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_request();
        stats.record_cleanup(99);

        stats.reset();
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_request();

        let snapshot = StatsSnapshot::new(&stats, 3, 1, Vec::new());
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["hitRate"], 1.0);
        assert_eq!(json["memoryCacheSize"], 3);
        assert_eq!(json["persistentCacheSize"], 1);
        assert!(json["lastCleanupAt"].is_null());
    }
}
