//! Request Deduplication Module
//!
//! Coalesces concurrent fetches for the same cache key into one shared
//! in-flight future.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::FetchError;

/// Outcome of an upstream fetch, shared by every waiter.
pub type FetchResult = std::result::Result<Value, FetchError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

// == Request Deduplicator ==
/// Registry of in-flight fetches keyed by cache key.
///
/// A registration is removed as soon as its fetch settles, whether it
/// succeeded or failed.
#[derive(Clone, Default)]
pub struct RequestDeduplicator {
    pending: Arc<Mutex<HashMap<String, SharedFetch>>>,
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    // == Dedupe ==
    /// Awaits the in-flight fetch for `key`, starting one with `factory` if
    /// none is registered.
    pub async fn dedupe<F>(&self, key: &str, factory: F) -> FetchResult
    where
        F: FnOnce() -> BoxFuture<'static, FetchResult>,
    {
        let shared = {
            let mut pending = self.pending.lock().await;
            match pending.get(key) {
                Some(in_flight) => {
                    debug!("Joining in-flight request: {}", key);
                    in_flight.clone()
                }
                None => {
                    let registry = Arc::clone(&self.pending);
                    let owned_key = key.to_string();
                    let fetch = factory();

                    let shared = async move {
                        let result = fetch.await;
                        registry.lock().await.remove(&owned_key);
                        result
                    }
                    .boxed()
                    .shared();

                    pending.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of fetches currently in flight.
    pub async fn in_flight(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl fmt::Debug for RequestDeduplicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDeduplicator").finish_non_exhaustive()
    }
}
