//! Live-key index.
//!
//! Optional strategy upgrade over pattern scans: every cache write records
//! its key under its KeyFamily, so invalidating a family is a direct
//! lookup instead of a linear scan of the keyspace.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::keys::{CacheKey, KeyPrefix};
use crate::lock::{rw_read, rw_write};

const SOURCE: &str = "aangan_cache::index";

/// Maps family base (`tag:id`) to the rendered keys currently live in the
/// store for that family.
///
/// The index may over-report: a recorded key that has since expired is
/// still listed until its family is taken. Deleting an absent key is a
/// no-op downstream, so over-reporting is harmless.
pub struct KeyIndex {
    families: RwLock<HashMap<String, HashSet<String>>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(HashMap::new()),
        }
    }

    /// Record a key as live. Called after every successful cache write.
    pub fn record(&self, key: &CacheKey) {
        rw_write(&self.families, SOURCE, "record")
            .entry(key.family().render())
            .or_default()
            .insert(key.render());
    }

    /// Remove and return every recorded key of a family.
    pub fn take(&self, prefix: &KeyPrefix) -> Vec<String> {
        rw_write(&self.families, SOURCE, "take")
            .remove(&prefix.render())
            .map(|keys| keys.into_iter().collect())
            .unwrap_or_default()
    }

    /// Drop one key from its family, keeping the rest.
    pub fn forget(&self, key: &CacheKey) {
        let mut families = rw_write(&self.families, SOURCE, "forget");
        let family = key.family().render();
        if let Some(keys) = families.get_mut(&family) {
            keys.remove(&key.render());
            if keys.is_empty() {
                families.remove(&family);
            }
        }
    }

    pub fn family_count(&self) -> usize {
        rw_read(&self.families, SOURCE, "family_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.families, SOURCE, "key_count")
            .values()
            .map(HashSet::len)
            .sum()
    }

    pub fn clear(&self) {
        rw_write(&self.families, SOURCE, "clear").clear();
    }
}

impl Default for KeyIndex {
    fn default() -> Self {
        Self::new()
    }
}
