//! Read-through accessor.
//!
//! The read half of the cache-aside contract: return the cached snapshot
//! when live, otherwise run the authoritative loader and repopulate. Cache
//! malfunctions degrade latency only; loader errors are the caller's.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::index::KeyIndex;
use crate::keys::CacheKey;
use crate::store::CacheStore;

pub(crate) const METRIC_HIT_TOTAL: &str = "aangan_cache_hit_total";
pub(crate) const METRIC_MISS_TOTAL: &str = "aangan_cache_miss_total";
pub(crate) const METRIC_BYPASS_TOTAL: &str = "aangan_cache_bypass_total";
pub(crate) const METRIC_CORRUPT_TOTAL: &str = "aangan_cache_corrupt_total";

/// Read-through access over an injected [`CacheStore`].
///
/// Cheap to clone; share one per process or build ad hoc around the same
/// store, state lives in the store and optional index.
#[derive(Clone)]
pub struct ReadThrough {
    store: Arc<dyn CacheStore>,
    index: Option<Arc<KeyIndex>>,
    enabled: bool,
}

impl ReadThrough {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            index: None,
            enabled: true,
        }
    }

    /// Record every populated key in a [`KeyIndex`] so invalidation can
    /// skip the prefix scan.
    #[must_use]
    pub fn with_index(mut self, index: Arc<KeyIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Disable caching entirely; every read goes straight to the loader.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Cache-aside read.
    ///
    /// - Live entry: deserialized and returned, loader not invoked.
    /// - Miss or expired: loader runs; `Ok(None)` ("not found") propagates
    ///   uncached; a value is stored under `ttl` and returned.
    /// - Store unreachable: falls back to the loader and skips the cache
    ///   write; the caller never sees a cache error.
    /// - Corrupt entry: treated as a miss and deleted best-effort.
    ///
    /// Concurrent misses on one key are not coalesced; the last writer
    /// wins, bounded by `ttl`.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        loader: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if !self.enabled {
            return loader().await;
        }

        let rendered = key.render();
        match self.store.get(&rendered).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    counter!(METRIC_HIT_TOTAL).increment(1);
                    debug!(key = %rendered, "Cache hit");
                    return Ok(Some(value));
                }
                Err(error) => {
                    counter!(METRIC_CORRUPT_TOTAL).increment(1);
                    warn!(key = %rendered, %error, "Corrupt cache entry; treating as miss");
                    if let Err(error) = self.store.delete(&rendered).await {
                        warn!(key = %rendered, %error, "Failed to delete corrupt cache entry");
                    }
                }
            },
            Ok(None) => {
                counter!(METRIC_MISS_TOTAL).increment(1);
                debug!(key = %rendered, "Cache miss");
            }
            Err(error) => {
                counter!(METRIC_BYPASS_TOTAL).increment(1);
                warn!(key = %rendered, %error, "Cache store unreachable; bypassing cache");
                return loader().await;
            }
        }

        let Some(value) = loader().await? else {
            // Never cache negative results.
            return Ok(None);
        };

        match serde_json::to_vec(&value) {
            Ok(bytes) => match self.store.set(&rendered, Bytes::from(bytes), ttl).await {
                Ok(()) => {
                    if let Some(index) = &self.index {
                        index.record(key);
                    }
                }
                Err(error) => {
                    warn!(key = %rendered, %error, "Cache write failed after load");
                }
            },
            Err(error) => {
                warn!(key = %rendered, %error, "Snapshot serialization failed; skipping cache write");
            }
        }

        Ok(Some(value))
    }

    /// Run `action` only if the witness key is absent, then set the witness.
    ///
    /// Backs the "mark all prior messages seen" write: expensive, safe to
    /// repeat, pointless after the first page view. Fails open, witness
    /// lookup errors run the action anyway. Returns whether the action ran.
    pub async fn mark_seen_once<E, F, Fut>(
        &self,
        witness: &CacheKey,
        ttl: Duration,
        action: F,
    ) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let rendered = witness.render();
        if self.enabled {
            match self.store.get(&rendered).await {
                Ok(Some(_)) => {
                    debug!(key = %rendered, "Seen witness present; skipping bulk action");
                    return Ok(false);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(key = %rendered, %error, "Witness lookup failed; running action anyway");
                }
            }
        }

        action().await?;

        if self.enabled {
            if let Err(error) = self
                .store
                .set(&rendered, Bytes::from_static(b"1"), ttl)
                .await
            {
                warn!(key = %rendered, %error, "Failed to set seen witness");
            }
        }
        Ok(true)
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }
}
