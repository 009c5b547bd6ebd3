//! Reader configuration.
//!
//! # Example
//!
//! ```
//! use uhf_reader::ReaderConfig;
//! use std::time::Duration;
//!
//! let config = ReaderConfig::default()
//!     .with_default_power(24)
//!     .with_failure_backoff(Duration::from_secs(1));
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.success_backoff(), Duration::from_millis(100));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uhf_core::constants::{DEFAULT_POWER_DBM, FAILURE_BACKOFF_MS, SUCCESS_BACKOFF_MS};
use uhf_core::{Error, Result};

/// Configuration for a [`Reader`](crate::Reader).
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Transmit power applied when the reader becomes ready (dBm).
    pub default_power_dbm: i32,

    /// Delay before re-issuing a round after a successful one.
    pub success_backoff_ms: u64,

    /// Delay before re-issuing a round after a failed one.
    pub failure_backoff_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            default_power_dbm: DEFAULT_POWER_DBM,
            success_backoff_ms: SUCCESS_BACKOFF_MS,
            failure_backoff_ms: FAILURE_BACKOFF_MS,
        }
    }
}

impl ReaderConfig {
    /// Set the power applied on init.
    pub fn with_default_power(mut self, dbm: i32) -> Self {
        self.default_power_dbm = dbm;
        self
    }

    /// Set the success backoff.
    pub fn with_success_backoff(mut self, backoff: Duration) -> Self {
        self.success_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Set the failure backoff.
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Success backoff as a `Duration`.
    pub fn success_backoff(&self) -> Duration {
        Duration::from_millis(self.success_backoff_ms)
    }

    /// Failure backoff as a `Duration`.
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }

    /// Check the backoff pair.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the success backoff is zero or the failure
    /// backoff is not strictly longer than the success backoff.
    pub fn validate(&self) -> Result<()> {
        if self.success_backoff_ms == 0 {
            return Err(Error::Config(
                "success_backoff_ms must be greater than zero".to_string(),
            ));
        }
        if self.failure_backoff_ms <= self.success_backoff_ms {
            return Err(Error::Config(format!(
                "failure_backoff_ms ({}) must exceed success_backoff_ms ({})",
                self.failure_backoff_ms, self.success_backoff_ms
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is malformed or invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.default_power_dbm, 26);
        assert_eq!(config.success_backoff(), Duration::from_millis(100));
        assert_eq!(config.failure_backoff(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(0, 500)]
    #[case(100, 100)]
    #[case(500, 100)]
    fn test_invalid_backoffs(#[case] success_ms: u64, #[case] failure_ms: u64) {
        let config = ReaderConfig {
            success_backoff_ms: success_ms,
            failure_backoff_ms: failure_ms,
            ..ReaderConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = ReaderConfig::from_json(r#"{"default_power_dbm": 20}"#).unwrap();
        assert_eq!(config.default_power_dbm, 20);
        assert_eq!(config.success_backoff_ms, 100);
        assert_eq!(config.failure_backoff_ms, 500);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(ReaderConfig::from_json("not json").is_err());
        assert!(
            ReaderConfig::from_json(r#"{"success_backoff_ms": 800}"#).is_err(),
            "failure backoff must stay above success backoff"
        );
    }

    #[test]
    fn test_builder_setters() {
        let config = ReaderConfig::default()
            .with_success_backoff(Duration::from_millis(50))
            .with_failure_backoff(Duration::from_millis(250));
        assert_eq!(config.success_backoff_ms, 50);
        assert_eq!(config.failure_backoff_ms, 250);
    }
}
