//! Cache settings.
//!
//! Layered precedence: optional TOML file, then `AANGAN_CACHE_*`
//! environment overrides. Every field has a default so the engine runs
//! with no configuration at all.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::SetupError;
use crate::keys::EntityKind;
use crate::policy::{
    EPHEMERAL_TTL_SECS, STABLE_TTL_SECS, TtlClass, VOLATILE_TTL_SECS, WITNESS_TTL_SECS,
};

const DEFAULT_CONFIG_BASENAME: &str = "aangan";
const ENV_PREFIX: &str = "AANGAN_CACHE";
const DEFAULT_TRANSIENT_CAPACITY: usize = 1024;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Cache layer settings from `aangan.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Master switch; when false every read goes straight to the loader.
    pub enabled: bool,
    /// Resolve KeyFamilies through a live-key index instead of prefix scans.
    pub use_key_index: bool,
    /// TTL override for verification artifacts.
    pub ephemeral_ttl_secs: u64,
    /// TTL override for frequently-mutated collections.
    pub volatile_ttl_secs: u64,
    /// TTL override for rarely-changing entities.
    pub stable_ttl_secs: u64,
    /// TTL override for seen-witness markers.
    pub witness_ttl_secs: u64,
    /// Capacity bound of the transient (OTP/pending-signup) store.
    pub transient_capacity: usize,
    /// Cadence of the in-memory store's expiry sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            use_key_index: false,
            ephemeral_ttl_secs: EPHEMERAL_TTL_SECS,
            volatile_ttl_secs: VOLATILE_TTL_SECS,
            stable_ttl_secs: STABLE_TTL_SECS,
            witness_ttl_secs: WITNESS_TTL_SECS,
            transient_capacity: DEFAULT_TRANSIENT_CAPACITY,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    /// Load settings from `path` (or `aangan.toml` beside the process if
    /// absent), then apply `AANGAN_CACHE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, SetupError> {
        let builder = match path {
            Some(path) => Config::builder().add_source(File::from(path)),
            None => Config::builder()
                .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false)),
        };
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Effective TTL for a class, after overrides.
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        let secs = match class {
            TtlClass::Ephemeral => self.ephemeral_ttl_secs,
            TtlClass::Volatile => self.volatile_ttl_secs,
            TtlClass::Stable => self.stable_ttl_secs,
            TtlClass::Witness => self.witness_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    /// Effective TTL for views of an entity kind.
    pub fn ttl_for_kind(&self, kind: EntityKind) -> Duration {
        self.ttl_for(kind.ttl_class())
    }

    /// Transient capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn transient_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.transient_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
