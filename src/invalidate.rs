//! Write-invalidation coordinator.
//!
//! The write half of the cache-aside contract. Invoked strictly after the
//! system-of-record write commits; never before. Every store failure here
//! is logged and swallowed. A stale entry is a bounded-duration (TTL)
//! issue, never grounds to fail or roll back the triggering write.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, warn};

use crate::index::KeyIndex;
use crate::keys::{CacheKey, EntityKind, KeyPrefix};
use crate::policy::InvalidationPlan;
use crate::store::CacheStore;

pub(crate) const METRIC_INVALIDATED_KEYS_TOTAL: &str = "aangan_cache_invalidated_keys_total";
pub(crate) const METRIC_INVALIDATE_MS: &str = "aangan_cache_invalidate_ms";
pub(crate) const METRIC_REFRESH_TOTAL: &str = "aangan_cache_refresh_total";

/// Deletes (or rewrites) every cache key a committed write could have made
/// stale: the KeyFamily behind a prefix plus explicitly named extra keys.
#[derive(Clone)]
pub struct InvalidationCoordinator {
    store: Arc<dyn CacheStore>,
    index: Option<Arc<KeyIndex>>,
    enabled: bool,
}

impl InvalidationCoordinator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            index: None,
            enabled: true,
        }
    }

    /// Resolve families through a [`KeyIndex`] instead of scanning.
    ///
    /// The same index must be attached to the [`crate::ReadThrough`] that
    /// populates the store, otherwise families resolve empty.
    #[must_use]
    pub fn with_index(mut self, index: Arc<KeyIndex>) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Invalidate the whole KeyFamily of `(kind, id)` plus `extra_keys`.
    ///
    /// Idempotent; calling twice leaves the same end state. Store failures
    /// are absorbed, TTL expiry bounds any staleness they leave behind.
    pub async fn invalidate(&self, kind: EntityKind, id: &str, extra_keys: &[CacheKey]) {
        if !self.enabled {
            return;
        }
        let started_at = Instant::now();
        let prefix = KeyPrefix::new(kind, id);

        let mut removed = 0usize;
        removed += self.drop_family(&prefix).await;

        for key in extra_keys {
            removed += self.drop_key(key).await;
        }

        counter!(METRIC_INVALIDATED_KEYS_TOTAL).increment(removed as u64);
        histogram!(METRIC_INVALIDATE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(family = %prefix, removed, extra = extra_keys.len(), "Invalidated cache family");
    }

    /// Execute a policy plan: drop every named family and key.
    ///
    /// Keys listed in `plan.refresh` are dropped too; callers holding the
    /// authoritative post-write value should follow up with [`Self::refresh`]
    /// so hot single-entity keys skip the post-write miss storm.
    pub async fn apply(&self, plan: &InvalidationPlan) {
        if !self.enabled {
            return;
        }
        let started_at = Instant::now();

        let mut removed = 0usize;
        for prefix in &plan.prefixes {
            removed += self.drop_family(prefix).await;
        }
        for key in plan.keys.iter().chain(&plan.refresh) {
            removed += self.drop_key(key).await;
        }

        counter!(METRIC_INVALIDATED_KEYS_TOTAL).increment(removed as u64);
        histogram!(METRIC_INVALIDATE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(
            families = plan.prefixes.len(),
            keys = plan.keys.len(),
            removed,
            "Applied invalidation plan"
        );
    }

    /// Write-through repopulation: rewrite a key with a known-fresh value
    /// and a fresh TTL instead of merely deleting it.
    pub async fn refresh<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if !self.enabled {
            return;
        }
        let rendered = key.render();
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => Bytes::from(bytes),
            Err(error) => {
                warn!(key = %rendered, %error, "Refresh serialization failed; leaving key absent");
                return;
            }
        };
        match self.store.set(&rendered, bytes, ttl).await {
            Ok(()) => {
                if let Some(index) = &self.index {
                    index.record(key);
                }
                counter!(METRIC_REFRESH_TOTAL).increment(1);
                debug!(key = %rendered, "Refreshed cache entry write-through");
            }
            Err(error) => {
                warn!(key = %rendered, %error, "Refresh write failed; key left to TTL");
            }
        }
    }

    /// Delete every live key of a family. Returns how many were targeted.
    async fn drop_family(&self, prefix: &KeyPrefix) -> usize {
        let keys = match &self.index {
            Some(index) => index.take(prefix),
            None => match self.store.scan_prefix(prefix).await {
                Ok(keys) => keys,
                Err(error) => {
                    warn!(family = %prefix, %error, "Family scan failed; staleness bounded by TTL");
                    return 0;
                }
            },
        };
        if keys.is_empty() {
            return 0;
        }
        match self.store.delete_many(&keys).await {
            Ok(()) => keys.len(),
            Err(error) => {
                warn!(family = %prefix, %error, "Family delete failed; staleness bounded by TTL");
                0
            }
        }
    }

    async fn drop_key(&self, key: &CacheKey) -> usize {
        if let Some(index) = &self.index {
            index.forget(key);
        }
        let rendered = key.render();
        match self.store.delete(&rendered).await {
            Ok(()) => 1,
            Err(error) => {
                warn!(key = %rendered, %error, "Key delete failed; staleness bounded by TTL");
                0
            }
        }
    }
}
