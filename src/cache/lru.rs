//! LRU Selection Module
//!
//! Picks the least recently accessed entries of a strategy when a tier holds
//! more of them than the strategy's `max_size` allows.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == LRU Victims ==
/// Returns the keys to delete so that at most `max_size` entries tagged with
/// `strategy_name` remain in `tier`.
///
/// Candidates are ordered by `last_accessed` ascending; ties break on the key
/// so the choice is deterministic.
pub fn lru_victims(
    tier: &HashMap<String, CacheEntry>,
    strategy_name: &str,
    max_size: usize,
) -> Vec<String> {
    let mut candidates: Vec<(&String, u64)> = tier
        .iter()
        .filter(|(_, entry)| entry.strategy_name == strategy_name)
        .map(|(key, entry)| (key, entry.last_accessed))
        .collect();

    if candidates.len() <= max_size {
        return Vec::new();
    }

    candidates.sort_by(|(key_a, at_a), (key_b, at_b)| {
        at_a.cmp(at_b).then_with(|| key_a.cmp(key_b))
    });

    let excess = candidates.len() - max_size;
    candidates
        .into_iter()
        .take(excess)
        .map(|(key, _)| key.clone())
        .collect()
}

// == Evict Over Capacity ==
/// Removes LRU entries of `strategy_name` from `tier` beyond `max_size`.
///
/// Returns the number of entries removed.
pub fn evict_over_capacity(
    tier: &mut HashMap<String, CacheEntry>,
    strategy_name: &str,
    max_size: usize,
) -> usize {
    let victims = lru_victims(tier, strategy_name, max_size);
    for key in &victims {
        tier.remove(key);
    }
    victims.len()
}
