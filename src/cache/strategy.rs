//! Cache Strategy Module
//!
//! Per-category cache policies and the ordered rule list that maps an
//! endpoint path to its policy.

use std::fmt;

use serde::{Deserialize, Serialize};

// == Priority ==
/// Informational priority of a strategy. Eviction does not read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

// == Cache Strategy ==
/// TTL, persistence and size policy for one class of endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStrategy {
    /// Strategy name, stored on every entry written with it
    pub name: String,
    /// Age in milliseconds after which an entry is stale
    pub ttl_ms: u64,
    /// Whether entries are mirrored to durable storage
    pub persistent: bool,
    pub priority: Priority,
    /// Maximum entries tagged with this strategy, per tier
    pub max_size: usize,
}

impl CacheStrategy {
    // == Constructor ==
    pub fn new(
        name: impl Into<String>,
        ttl_ms: u64,
        persistent: bool,
        priority: Priority,
        max_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            ttl_ms,
            persistent,
            priority,
            max_size,
        }
    }

    /// A strategy that can hold no entries cannot be used as a fallback.
    pub fn is_usable(&self) -> bool {
        self.max_size > 0
    }
}

// == Strategy Rule ==
/// Endpoint predicate used by a [`StrategyRule`].
pub type EndpointPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One `(predicate, strategy)` pair of the resolution list.
pub struct StrategyRule {
    predicate: EndpointPredicate,
    strategy: CacheStrategy,
}

impl StrategyRule {
    pub fn new(
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        strategy: CacheStrategy,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            strategy,
        }
    }

    /// Rule matching any endpoint that contains one of `needles`.
    pub fn contains_any(needles: &'static [&'static str], strategy: CacheStrategy) -> Self {
        Self::new(
            move |endpoint| needles.iter().any(|needle| endpoint.contains(needle)),
            strategy,
        )
    }

    pub fn matches(&self, endpoint: &str) -> bool {
        (self.predicate)(endpoint)
    }

    pub fn strategy(&self) -> &CacheStrategy {
        &self.strategy
    }
}

impl fmt::Debug for StrategyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRule")
            .field("strategy", &self.strategy.name)
            .finish_non_exhaustive()
    }
}

// == Strategy Table ==
/// Ordered rule list plus the fallback strategy.
///
/// Rules are evaluated in insertion order and the first match wins; an
/// endpoint that matches nothing resolves to the fallback.
#[derive(Debug)]
pub struct StrategyTable {
    rules: Vec<StrategyRule>,
    fallback: CacheStrategy,
}

/// Name of the fallback strategy in the built-in table.
pub const DEFAULT_STRATEGY: &str = "default";

const SECOND: u64 = 1_000;
const MINUTE: u64 = 60 * SECOND;

impl StrategyTable {
    pub fn new(rules: Vec<StrategyRule>, fallback: CacheStrategy) -> Self {
        Self { rules, fallback }
    }

    /// The storefront's category table.
    pub fn builtin() -> Self {
        let rules = vec![
            StrategyRule::contains_any(
                &["/product"],
                CacheStrategy::new("products", 5 * MINUTE, true, Priority::High, 100),
            ),
            StrategyRule::contains_any(
                &["/categor"],
                CacheStrategy::new("categories", 30 * MINUTE, true, Priority::High, 50),
            ),
            StrategyRule::contains_any(
                &["/user", "/auth"],
                CacheStrategy::new("user", 2 * MINUTE, false, Priority::Medium, 20),
            ),
            StrategyRule::contains_any(
                &["/cart"],
                CacheStrategy::new("cart", 30 * SECOND, false, Priority::High, 10),
            ),
            StrategyRule::contains_any(
                &["/search"],
                CacheStrategy::new("search", 3 * MINUTE, false, Priority::Medium, 50),
            ),
            StrategyRule::contains_any(
                &["/static", "/config"],
                CacheStrategy::new("static", 60 * MINUTE, true, Priority::Low, 30),
            ),
        ];

        Self::new(
            rules,
            CacheStrategy::new(DEFAULT_STRATEGY, MINUTE, false, Priority::Low, 50),
        )
    }

    // == Resolve ==
    /// Returns the strategy for `endpoint`. Never fails.
    pub fn resolve(&self, endpoint: &str) -> &CacheStrategy {
        self.rules
            .iter()
            .find(|rule| rule.matches(endpoint))
            .map(StrategyRule::strategy)
            .unwrap_or(&self.fallback)
    }

    /// Looks a strategy up by name.
    pub fn get(&self, name: &str) -> Option<&CacheStrategy> {
        if self.fallback.name == name {
            return Some(&self.fallback);
        }
        self.rules
            .iter()
            .map(StrategyRule::strategy)
            .find(|strategy| strategy.name == name)
    }

    pub fn fallback(&self) -> &CacheStrategy {
        &self.fallback
    }

    /// All strategies in resolution order, fallback last.
    pub fn strategies(&self) -> Vec<CacheStrategy> {
        self.rules
            .iter()
            .map(|rule| rule.strategy().clone())
            .chain(std::iter::once(self.fallback.clone()))
            .collect()
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
