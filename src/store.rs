//! Cache store interface and in-process implementation.
//!
//! The store is the sole shared mutable resource of the engine. It is
//! injected behind [`CacheStore`] so request handlers, the coordinator, and
//! tests can substitute backends without hidden global coupling.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::keys::KeyPrefix;
use crate::lock::{rw_read, rw_write};

const SOURCE: &str = "aangan_cache::store";

/// Key-value store with per-key expiry and family-prefix scans.
///
/// Contract notes:
/// - Expired entries are absent for every operation, `scan_prefix` included.
/// - `scan_prefix` matches the bare family base and any key extending it
///   with `:` (see [`KeyPrefix::matches`]), never a longer id that happens
///   to share a string prefix.
/// - Deleting an absent key is a no-op, not an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn scan_prefix(&self, prefix: &KeyPrefix) -> Result<Vec<String>, StoreError>;
    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError>;
}

struct Entry {
    value: Bytes,
    expires_at: OffsetDateTime,
}

/// In-process [`CacheStore`] with lazy expiry.
///
/// Expired entries are dropped when touched; [`MemoryStore::sweep`] (or the
/// background sweeper) reclaims the rest.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.expires_at <= self.clock.now()
    }

    /// Drop every expired entry. Returns the number reclaimed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "sweep");
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let reclaimed = before - entries.len();
        if reclaimed > 0 {
            debug!(reclaimed, "Swept expired cache entries");
        }
        reclaimed
    }

    /// Periodically sweep expired entries on a background task.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                store.sweep();
            }
        })
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        rw_read(&self.entries, SOURCE, "len")
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if self.is_expired(entry) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = self.clock.now() + ttl;
        rw_write(&self.entries, SOURCE, "set").insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        rw_write(&self.entries, SOURCE, "delete").remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &KeyPrefix) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        let entries = rw_read(&self.entries, SOURCE, "scan_prefix");
        Ok(entries
            .iter()
            .filter(|(key, entry)| entry.expires_at > now && prefix.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_many");
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}
