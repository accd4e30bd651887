//! Cache Store Module
//!
//! Two-tier cache engine: a volatile memory tier over a persistent tier that
//! is mirrored to durable storage.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::persistence::{decode_record, encode_record, DurableStorage, STORAGE_KEY};
use crate::cache::{
    lru, report_swallowed, CacheEntry, CacheStats, CacheStrategy, Clock, StrategyTable,
};
use crate::error::{CacheError, Result};

// == Sweep Report ==
/// Entries removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub memory_removed: usize,
    pub persistent_removed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.memory_removed + self.persistent_removed
    }
}

// == Lookup ==
/// Outcome of [`CacheStore::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Fresh data, counted as a hit
    Fresh(Value),
    /// Data of an expired entry that was just deleted, counted as a miss
    Stale(Value),
    /// Nothing in either tier, counted as a miss
    Miss,
}

// == Cache Store ==
/// Memory and persistent tiers with their statistics.
#[derive(Debug)]
pub struct CacheStore {
    /// Always written on `set`
    memory: HashMap<String, CacheEntry>,
    /// Written only for persistent strategies
    persistent: HashMap<String, CacheEntry>,
    strategies: Arc<StrategyTable>,
    storage: Arc<dyn DurableStorage>,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store and loads the persistent tier from `storage`.
    ///
    /// An unreadable or corrupt record yields an empty persistent tier.
    pub fn new(
        strategies: Arc<StrategyTable>,
        storage: Arc<dyn DurableStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut store = Self {
            memory: HashMap::new(),
            persistent: HashMap::new(),
            strategies,
            storage,
            clock,
            stats: CacheStats::new(),
        };
        store.load_persistent();
        store
    }

    fn load_persistent(&mut self) {
        let raw = match self.storage.read(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                report_swallowed("load_persistent", &err);
                return;
            }
        };

        match decode_record(&raw, &self.strategies) {
            Ok(decoded) => {
                self.persistent = decoded.entries;
                info!(
                    "Loaded {} persisted cache entries ({} invalid dropped)",
                    self.persistent.len(),
                    decoded.dropped
                );
                if decoded.dropped > 0 {
                    self.persist();
                }
            }
            Err(err) => {
                report_swallowed("load_persistent", &err);
                if let Err(err) = self.storage.remove(STORAGE_KEY) {
                    report_swallowed("load_persistent", &err);
                }
            }
        }
    }

    /// Rewrites the durable record from the persistent tier.
    fn persist(&self) {
        let result = encode_record(&self.persistent)
            .and_then(|raw| self.storage.write(STORAGE_KEY, &raw));
        if let Err(err) = result {
            report_swallowed("persist", &err);
        }
    }

    // == Get ==
    /// Returns fresh data for `key`, checking memory then the persistent tier.
    ///
    /// Stale entries met on the way are deleted. A persistent hit is promoted
    /// into memory.
    pub fn get(&mut self, key: &str, strategy: &CacheStrategy) -> Option<Value> {
        match self.lookup(key, strategy) {
            Lookup::Fresh(data) => Some(data),
            Lookup::Stale(_) | Lookup::Miss => None,
        }
    }

    /// Same as [`get`](Self::get), but hands back the data of a stale entry
    /// it deleted so a failed refetch can still fall back to it.
    pub fn lookup(&mut self, key: &str, strategy: &CacheStrategy) -> Lookup {
        let now = self.clock.now_ms();
        let mut stale = None;

        if let Some(entry) = self.memory.get_mut(key) {
            if entry.is_fresh(strategy, now) {
                entry.touch(now);
                self.stats.record_hit();
                return Lookup::Fresh(entry.data.clone());
            }
            debug!("Dropping stale memory entry: {}", key);
            stale = self.memory.remove(key).map(|entry| entry.data);
        }

        if strategy.persistent {
            let freshness = self
                .persistent
                .get(key)
                .map(|entry| entry.is_fresh(strategy, now));

            match freshness {
                Some(true) => {
                    if let Some(entry) = self.persistent.get_mut(key) {
                        entry.touch(now);
                        let promoted = entry.clone();
                        let data = promoted.data.clone();
                        self.memory.insert(key.to_string(), promoted);
                        lru::evict_over_capacity(
                            &mut self.memory,
                            &strategy.name,
                            strategy.max_size,
                        );
                        self.stats.record_hit();
                        return Lookup::Fresh(data);
                    }
                }
                Some(false) => {
                    debug!("Dropping stale persistent entry: {}", key);
                    let removed = self.persistent.remove(key).map(|entry| entry.data);
                    stale = stale.or(removed);
                    self.persist();
                }
                None => {}
            }
        }

        self.stats.record_miss();
        match stale {
            Some(data) => Lookup::Stale(data),
            None => Lookup::Miss,
        }
    }

    // == Set ==
    /// Stores `data` under `key` and enforces the strategy's `max_size`.
    pub fn set(&mut self, key: String, data: Value, strategy: &CacheStrategy) {
        let entry = CacheEntry::new(data, strategy, self.clock.now_ms());

        if strategy.persistent {
            self.persistent.insert(key.clone(), entry.clone());
            lru::evict_over_capacity(&mut self.persistent, &strategy.name, strategy.max_size);
            self.persist();
        }

        self.memory.insert(key, entry);
        lru::evict_over_capacity(&mut self.memory, &strategy.name, strategy.max_size);
    }

    // == Get Stale ==
    /// Returns data for `key` from either tier regardless of age.
    ///
    /// Not counted in statistics.
    pub fn get_stale(&self, key: &str) -> Option<Value> {
        self.memory
            .get(key)
            .or_else(|| self.persistent.get(key))
            .map(|entry| entry.data.clone())
    }

    // == Remove ==
    /// Deletes `key` from both tiers. Returns true if anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let in_memory = self.memory.remove(key).is_some();
        let in_persistent = self.persistent.remove(key).is_some();
        if in_persistent {
            self.persist();
        }
        in_memory || in_persistent
    }

    // == Invalidate Matching ==
    /// Deletes every key containing `pattern` from both tiers.
    ///
    /// Returns the number of entries removed across both tiers.
    pub fn invalidate_matching(&mut self, pattern: &str) -> usize {
        let memory_before = self.memory.len();
        let persistent_before = self.persistent.len();

        self.memory.retain(|key, _| !key.contains(pattern));
        self.persistent.retain(|key, _| !key.contains(pattern));

        let persistent_removed = persistent_before - self.persistent.len();
        if persistent_removed > 0 {
            self.persist();
        }
        (memory_before - self.memory.len()) + persistent_removed
    }

    // == Sweep ==
    /// Removes invalid and expired entries from both tiers.
    ///
    /// An entry whose strategy is no longer known is judged by the fallback
    /// strategy. Fails if that fallback is unusable; the caller is expected
    /// to reset the whole store in that case.
    pub fn sweep(&mut self) -> Result<SweepReport> {
        let now = self.clock.now_ms();

        let memory_removed = sweep_tier(&mut self.memory, &self.strategies, now)?;
        let persistent_removed = sweep_tier(&mut self.persistent, &self.strategies, now)?;

        if persistent_removed > 0 {
            self.persist();
        }
        self.stats.record_cleanup(now);

        Ok(SweepReport {
            memory_removed,
            persistent_removed,
        })
    }

    // == Clear ==
    /// Wipes both tiers, the durable record and the statistics.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.persistent.clear();
        self.stats.reset();
        if let Err(err) = self.storage.remove(STORAGE_KEY) {
            report_swallowed("clear", &err);
        }
    }

    // == Stats ==
    pub fn record_request(&mut self) {
        self.stats.record_request();
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn persistent_len(&self) -> usize {
        self.persistent.len()
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }
}

/// Deletes expired entries of one tier, returning how many were removed.
fn sweep_tier(
    tier: &mut HashMap<String, CacheEntry>,
    strategies: &StrategyTable,
    now: u64,
) -> Result<usize> {
    let mut doomed = Vec::new();

    for (key, entry) in tier.iter() {
        let strategy = match strategies.get(&entry.strategy_name) {
            Some(strategy) => strategy,
            None => {
                let fallback = strategies.fallback();
                if !fallback.is_usable() {
                    return Err(CacheError::Internal(format!(
                        "entry {} has unknown strategy {} and fallback {} is unusable",
                        key, entry.strategy_name, fallback.name
                    )));
                }
                fallback
            }
        };

        if entry.is_expired(strategy, now) {
            doomed.push(key.clone());
        }
    }

    for key in &doomed {
        tier.remove(key);
    }
    Ok(doomed.len())
}
