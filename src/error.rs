use thiserror::Error;

/// Failures raised by a [`crate::store::CacheStore`] backend.
///
/// These never reach an end user: read paths degrade to the loader and
/// write paths log and continue. The system of record stays authoritative.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },
    #[error("cache backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Failures raised while wiring the cache layer up (settings, telemetry).
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl SetupError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
