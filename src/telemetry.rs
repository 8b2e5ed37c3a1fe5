//! Tracing and metrics bootstrap for binaries embedding the cache layer.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::accessor::{
    METRIC_BYPASS_TOTAL, METRIC_CORRUPT_TOTAL, METRIC_HIT_TOTAL, METRIC_MISS_TOTAL,
};
use crate::error::SetupError;
use crate::invalidate::{
    METRIC_INVALIDATE_MS, METRIC_INVALIDATED_KEYS_TOTAL, METRIC_REFRESH_TOTAL,
};
use crate::transient::{
    METRIC_TRANSIENT_EVICTED_TOTAL, METRIC_TRANSIENT_EXPIRED_TOTAL, METRIC_TRANSIENT_HIT_TOTAL,
    METRIC_TRANSIENT_PUT_TOTAL,
};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber and describe the cache metrics.
///
/// `default_directive` seeds the env filter (e.g. `"info"`); `RUST_LOG`
/// still wins when set.
pub fn init(default_directive: &str) -> Result<(), SetupError> {
    describe_metrics();

    let directive = default_directive
        .parse()
        .map_err(|err| SetupError::telemetry(format!("invalid filter directive: {err}")))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init()
        .map_err(|err| {
            SetupError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions once per process.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Total number of cache hits."
        );
        describe_counter!(
            METRIC_MISS_TOTAL,
            Unit::Count,
            "Total number of cache misses."
        );
        describe_counter!(
            METRIC_BYPASS_TOTAL,
            Unit::Count,
            "Total number of reads that bypassed an unreachable cache store."
        );
        describe_counter!(
            METRIC_CORRUPT_TOTAL,
            Unit::Count,
            "Total number of cache entries dropped as undecodable."
        );
        describe_counter!(
            METRIC_INVALIDATED_KEYS_TOTAL,
            Unit::Count,
            "Total number of cache keys removed by invalidation."
        );
        describe_histogram!(
            METRIC_INVALIDATE_MS,
            Unit::Milliseconds,
            "Invalidation latency in milliseconds."
        );
        describe_counter!(
            METRIC_REFRESH_TOTAL,
            Unit::Count,
            "Total number of write-through cache refreshes."
        );
        describe_counter!(
            METRIC_TRANSIENT_PUT_TOTAL,
            Unit::Count,
            "Total number of transient entries stored."
        );
        describe_counter!(
            METRIC_TRANSIENT_HIT_TOTAL,
            Unit::Count,
            "Total number of transient entries served before expiry."
        );
        describe_counter!(
            METRIC_TRANSIENT_EXPIRED_TOTAL,
            Unit::Count,
            "Total number of transient entries found expired on access."
        );
        describe_counter!(
            METRIC_TRANSIENT_EVICTED_TOTAL,
            Unit::Count,
            "Total number of transient entries evicted at capacity."
        );
    });
}
