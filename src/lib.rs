//! Aangan cache-coherence core.
//!
//! The cache-aside engine shared by every request handler of the Aangan
//! residential-society platform: membership applications, bills,
//! complaints, notices, events, group messaging, friendships, staff and
//! vendor marketplaces.
//!
//! - **Key Builder** ([`CacheKey`], [`KeyPrefix`]): deterministic keys from
//!   entity tag, id, and ordered query dimensions.
//! - **Cache Store** ([`CacheStore`], [`MemoryStore`]): TTL'd key-value
//!   facade with family-prefix scans; the sole shared mutable resource.
//! - **Read-Through Accessor** ([`ReadThrough`]): cached snapshot when
//!   live, authoritative loader on miss, repopulate under TTL.
//! - **Write-Invalidation Coordinator** ([`InvalidationCoordinator`]):
//!   after a system-of-record commit, drop whole KeyFamilies plus named
//!   extra keys, or rewrite hot keys write-through.
//! - **Consistency Policy** ([`TtlClass`], [`WriteOp`]): static TTL table
//!   per entity class and the write → stale-key map.
//! - **Transient store** ([`TransientStore`]): bounded TTL'd primary
//!   storage for OTP codes and pending signups, outside the cache-aside
//!   contract.
//!
//! The system of record stays authoritative throughout: its errors always
//! surface, cache errors never do, and the only ordering guarantee is
//! write-then-invalidate. A crash between the two self-heals at TTL
//! expiry; that bounded staleness is the contract, not a bug.
//!
//! ## Configuration
//!
//! Settings load from `aangan.toml` with `AANGAN_CACHE_*` env overrides:
//!
//! ```toml
//! enabled = true
//! use_key_index = false
//! volatile_ttl_secs = 3600
//! stable_ttl_secs = 86400
//! # ... see config.rs for all options
//! ```

mod accessor;
mod clock;
mod config;
mod error;
mod index;
mod invalidate;
mod keys;
mod lock;
mod policy;
mod store;
pub mod telemetry;
mod transient;

pub use accessor::ReadThrough;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheSettings;
pub use error::{SetupError, StoreError};
pub use index::KeyIndex;
pub use invalidate::InvalidationCoordinator;
pub use keys::{CacheKey, EntityKind, KeyPrefix};
pub use policy::{
    EPHEMERAL_TTL_SECS, InvalidationPlan, STABLE_TTL_SECS, TtlClass, VOLATILE_TTL_SECS,
    WITNESS_TTL_SECS, WriteOp,
};
pub use store::{CacheStore, MemoryStore};
pub use transient::{TransientStore, mobile_otp_key, otp_key, pending_signup_key};
