//! Transient state store.
//!
//! OTP codes and pending-signup payloads have no system-of-record copy:
//! the store *is* their primary storage, authoritative and perishable.
//! That is a different correctness model from derived-and-reconstructible
//! cache views, so it gets its own bounded, TTL'd type instead of riding
//! the cache-aside contract. The invalidation coordinator never touches
//! this keyspace.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use time::OffsetDateTime;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::lock::mutex_lock;

const SOURCE: &str = "aangan_cache::transient";

pub(crate) const METRIC_TRANSIENT_PUT_TOTAL: &str = "aangan_transient_put_total";
pub(crate) const METRIC_TRANSIENT_HIT_TOTAL: &str = "aangan_transient_hit_total";
pub(crate) const METRIC_TRANSIENT_EXPIRED_TOTAL: &str = "aangan_transient_expired_total";
pub(crate) const METRIC_TRANSIENT_EVICTED_TOTAL: &str = "aangan_transient_evicted_total";

/// Key for a signup verification code sent by email.
pub fn otp_key(email: &str) -> String {
    format!("OTP:{email}")
}

/// Key for a mobile-number verification code.
pub fn mobile_otp_key(user_id: &str) -> String {
    format!("MOBILE_OTP:{user_id}")
}

/// Key for the signup payload held until its OTP is verified.
pub fn pending_signup_key(email: &str) -> String {
    format!("UserInfo:{email}")
}

struct TransientEntry {
    value: Bytes,
    expires_at: OffsetDateTime,
}

/// Bounded TTL'd store for verification artifacts.
///
/// Capacity-bounded with LRU eviction; losing an entry under pressure
/// means the user re-requests a code, never a correctness break.
pub struct TransientStore {
    entries: Mutex<LruCache<String, TransientEntry>>,
    clock: Arc<dyn Clock>,
}

impl TransientStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: NonZeroUsize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    pub fn put(&self, key: impl Into<String>, value: Bytes, ttl: Duration) {
        let key = key.into();
        let expires_at = self.clock.now() + ttl;
        let evicted = mutex_lock(&self.entries, SOURCE, "put")
            .push(key.clone(), TransientEntry { value, expires_at });
        counter!(METRIC_TRANSIENT_PUT_TOTAL).increment(1);
        // `push` also returns a replaced entry for the same key; only a
        // different key means capacity eviction.
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!(METRIC_TRANSIENT_EVICTED_TOTAL).increment(1);
            debug!(key = %evicted_key, "Transient entry evicted at capacity");
        }
    }

    /// Read without consuming; absent once expired.
    pub fn peek(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "peek");
        match entries.get(key) {
            Some(entry) if entry.expires_at <= now => {
                entries.pop(key);
                counter!(METRIC_TRANSIENT_EXPIRED_TOTAL).increment(1);
                None
            }
            Some(entry) => {
                counter!(METRIC_TRANSIENT_HIT_TOTAL).increment(1);
                Some(entry.value.clone())
            }
            None => None,
        }
    }

    /// Read and consume in one step, for one-shot artifacts.
    pub fn take(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "take");
        let entry = entries.pop(key)?;
        if entry.expires_at <= now {
            counter!(METRIC_TRANSIENT_EXPIRED_TOTAL).increment(1);
            return None;
        }
        counter!(METRIC_TRANSIENT_HIT_TOTAL).increment(1);
        Some(entry.value)
    }

    pub fn remove(&self, key: &str) {
        mutex_lock(&self.entries, SOURCE, "remove").pop(key);
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
