//! Event loop configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Limits applied by the event loop.
///
/// Every field has a default, so a config document only needs to name the
/// fields it changes.
///
/// # Examples
///
/// ```
/// use async_runtime::EventLoopConfig;
///
/// let config = EventLoopConfig::from_json(r#"{ "max_turns": 50 }"#).unwrap();
/// assert_eq!(config.max_turns, Some(50));
/// assert_eq!(config.max_microtasks_per_checkpoint, 1_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventLoopConfig {
    /// Upper bound on jobs run by one microtask checkpoint. Guards against
    /// promise chains that keep rescheduling themselves.
    pub max_microtasks_per_checkpoint: usize,
    /// Upper bound on loop turns for `run_until_done`; `None` is unlimited.
    pub max_turns: Option<u64>,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            max_microtasks_per_checkpoint: 1_000_000,
            max_turns: None,
        }
    }
}

impl EventLoopConfig {
    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML config.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes this config as pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that the loop can run with these limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_microtasks_per_checkpoint == 0 {
            return Err(ConfigError::Invalid(
                "max_microtasks_per_checkpoint must be greater than zero".to_string(),
            ));
        }
        if self.max_turns == Some(0) {
            return Err(ConfigError::Invalid(
                "max_turns must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
