//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their validity rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheStrategy, StrategyTable};

// == Cache Entry ==
/// A cached JSON response with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The cached response body
    pub data: Value,
    /// When the entry was stored (Unix milliseconds)
    pub timestamp: u64,
    /// Last read (Unix milliseconds)
    pub last_accessed: u64,
    /// Name of the strategy the entry was written with
    pub strategy_name: String,
    /// Length of the serialized data
    pub approx_size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stored at `now`.
    pub fn new(data: Value, strategy: &CacheStrategy, now: u64) -> Self {
        let approx_size_bytes = data.to_string().len();
        Self {
            data,
            timestamp: now,
            last_accessed: now,
            strategy_name: strategy.name.clone(),
            approx_size_bytes,
        }
    }

    // == Age ==
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    /// Readable: strictly younger than the TTL.
    pub fn is_fresh(&self, strategy: &CacheStrategy, now: u64) -> bool {
        self.age_ms(now) < strategy.ttl_ms
    }

    /// Sweepable: strictly older than the TTL.
    ///
    /// An entry whose age equals the TTL is neither fresh nor expired: reads
    /// miss it but the sweeper keeps it until the next pass.
    pub fn is_expired(&self, strategy: &CacheStrategy, now: u64) -> bool {
        self.age_ms(now) > strategy.ttl_ms
    }

    /// Records a read at `now`.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed = now;
    }

    // == Validation ==
    /// Entry fields are well-formed and its strategy is known.
    pub fn is_valid(&self, strategies: &StrategyTable) -> bool {
        strategies.get(&self.strategy_name).is_some()
    }

    /// Parses a persisted entry, rejecting anything malformed.
    ///
    /// Every field must be present, timestamps must be numbers and the
    /// strategy name must resolve in `strategies`.
    pub fn from_raw(raw: &Value, strategies: &StrategyTable) -> Option<Self> {
        let object = raw.as_object()?;
        let data = object.get("data")?.clone();
        let timestamp = as_millis(object.get("timestamp")?)?;
        let last_accessed = as_millis(object.get("lastAccessed")?)?;
        let strategy_name = object.get("strategyName")?.as_str()?.to_string();
        let approx_size_bytes = object.get("approxSizeBytes")?.as_u64()? as usize;

        let entry = Self {
            data,
            timestamp,
            last_accessed,
            strategy_name,
            approx_size_bytes,
        };
        entry.is_valid(strategies).then_some(entry)
    }
}

/// Accepts integral and float JSON numbers, rejects negatives and non-numbers.
fn as_millis(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms as u64)
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Priority;
    use serde_json::json;

    fn strategy(ttl_ms: u64) -> CacheStrategy {
        CacheStrategy::new("products", ttl_ms, true, Priority::High, 10)
    }

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new(json!({"id": 1}), &strategy(100), 5_000);

        assert_eq!(entry.timestamp, 5_000);
        assert_eq!(entry.last_accessed, 5_000);
        assert_eq!(entry.strategy_name, "products");
        assert_eq!(entry.approx_size_bytes, r#"{"id":1}"#.len());
    }

    #[test]
    fn test_freshness_boundary() {
        let strategy = strategy(100);
        let entry = CacheEntry::new(json!(1), &strategy, 1_000);

        assert!(entry.is_fresh(&strategy, 1_099));
        assert!(!entry.is_fresh(&strategy, 1_100));
        assert!(!entry.is_expired(&strategy, 1_100));
        assert!(entry.is_expired(&strategy, 1_101));
    }

    #[test]
    fn test_age_with_clock_behind_timestamp() {
        let entry = CacheEntry::new(json!(1), &strategy(100), 1_000);
        assert_eq!(entry.age_ms(500), 0);
    }

    #[test]
    fn test_touch_updates_last_accessed_only() {
        let mut entry = CacheEntry::new(json!(1), &strategy(100), 1_000);
        entry.touch(1_050);

        assert_eq!(entry.timestamp, 1_000);
        assert_eq!(entry.last_accessed, 1_050);
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = CacheEntry::new(json!([1, 2]), &strategy(100), 7);
        let raw = serde_json::to_value(&entry).unwrap();

        assert_eq!(raw["lastAccessed"], json!(7));
        assert_eq!(raw["strategyName"], json!("products"));
        assert!(raw.get("approxSizeBytes").is_some());
    }

    #[test]
    fn test_from_raw_accepts_valid_entry() {
        let table = StrategyTable::builtin();
        let raw = json!({
            "data": {"id": 1},
            "timestamp": 1000,
            "lastAccessed": 1500.0,
            "strategyName": "products",
            "approxSizeBytes": 8
        });

        let entry = CacheEntry::from_raw(&raw, &table).unwrap();
        assert_eq!(entry.last_accessed, 1_500);
        assert_eq!(entry.data, json!({"id": 1}));
    }

    #[test]
    fn test_from_raw_rejects_malformed_entries() {
        let table = StrategyTable::builtin();
        let valid = json!({
            "data": null,
            "timestamp": 1000,
            "lastAccessed": 1000,
            "strategyName": "products",
            "approxSizeBytes": 4
        });
        assert!(CacheEntry::from_raw(&valid, &table).is_some());

        for field in ["data", "timestamp", "lastAccessed", "strategyName", "approxSizeBytes"] {
            let mut broken = valid.clone();
            broken.as_object_mut().unwrap().remove(field);
            assert!(
                CacheEntry::from_raw(&broken, &table).is_none(),
                "entry without {} should be rejected",
                field
            );
        }

        let mut string_timestamp = valid.clone();
        string_timestamp["timestamp"] = json!("1000");
        assert!(CacheEntry::from_raw(&string_timestamp, &table).is_none());

        let mut negative = valid.clone();
        negative["lastAccessed"] = json!(-5);
        assert!(CacheEntry::from_raw(&negative, &table).is_none());

        let mut unknown_strategy = valid.clone();
        unknown_strategy["strategyName"] = json!("ghost");
        assert!(CacheEntry::from_raw(&unknown_strategy, &table).is_none());

        assert!(CacheEntry::from_raw(&json!("not an object"), &table).is_none());
    }
}
