//! Error types for the event loop and its configuration.

use core_types::Value;
use thiserror::Error;

/// Failures reported by the event loop.
///
/// Promise jobs never fail: their errors become rejections. These errors
/// only come from host tasks and from the loop's own limits.
#[derive(Debug, Error)]
pub enum EventLoopError {
    /// A host task threw and nothing caught it.
    #[error("uncaught exception: {0}")]
    UncaughtException(Value),

    /// A single microtask checkpoint ran more jobs than allowed.
    #[error("microtask checkpoint exceeded {limit} jobs")]
    MicrotaskLimitExceeded {
        /// The configured limit
        limit: usize,
    },

    /// The loop still had work after the configured number of turns.
    #[error("event loop still busy after {limit} turns")]
    TurnLimitExceeded {
        /// The configured limit
        limit: u64,
    },
}

/// Failures loading or validating an [`EventLoopConfig`](crate::EventLoopConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// The YAML document could not be parsed.
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field holds a value the loop cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for event loop operations
pub type LoopResult<T> = Result<T, EventLoopError>;
