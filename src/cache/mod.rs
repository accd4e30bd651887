//! Cache Module
//!
//! Two-tier response cache with per-endpoint strategies, LRU size limits,
//! request deduplication and durable persistence.

mod clock;
mod dedup;
mod entry;
mod key;
mod lru;
pub mod persistence;
mod stats;
mod store;
mod strategy;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use dedup::{FetchResult, RequestDeduplicator};
pub use entry::CacheEntry;
pub use key::{make_key, Credentials, RequestOptions};
pub use lru::{evict_over_capacity, lru_victims};
pub use persistence::{DurableStorage, FileStorage, MemoryStorage};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{CacheStore, Lookup, SweepReport};
pub use strategy::{CacheStrategy, Priority, StrategyRule, StrategyTable, DEFAULT_STRATEGY};

use tracing::warn;

// == Swallowed Errors ==
/// Single hook for every cache failure that is logged instead of returned.
///
/// Filter on the `storefront_cache::swallowed` target to inspect failure rates.
pub fn report_swallowed(operation: &str, error: &dyn std::error::Error) {
    warn!(
        target: "storefront_cache::swallowed",
        operation,
        error = %error,
        "cache failure swallowed"
    );
}
