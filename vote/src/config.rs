//! Configuration for vote controls.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tally_runtime::retry::RetryPolicy;
use thiserror::Error;

/// Invalid configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero submit timeout would fail every vote
    #[error("VOTE_SUBMIT_TIMEOUT_MS must be greater than zero")]
    ZeroSubmitTimeout,

    /// Backoff would start above its own cap
    #[error(
        "VOTE_RETRY_INITIAL_DELAY_MS ({initial_ms}) exceeds VOTE_RETRY_MAX_DELAY_MS ({max_ms})"
    )]
    RetryDelayInverted {
        /// Configured initial delay
        initial_ms: u64,
        /// Configured cap
        max_ms: u64,
    },
}

/// Vote control configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteConfig {
    /// Per-attempt deadline for a vote submission, in milliseconds
    pub submit_timeout_ms: u64,
    /// Retries after a transient submission failure
    pub retry_max: usize,
    /// Delay before the first retry, in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Cap on the backoff delay, in milliseconds
    pub retry_max_delay_ms: u64,
    /// Log filter (trace, debug, info, warn, error or an `EnvFilter` directive)
    pub log_level: String,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            submit_timeout_ms: 5_000,
            retry_max: 2,
            retry_initial_delay_ms: 200,
            retry_max_delay_ms: 2_000,
            log_level: "tally_vote=debug,tally_runtime=info".to_string(),
        }
    }
}

impl VoteConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to [`VoteConfig::default`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            submit_timeout_ms: lookup("VOTE_SUBMIT_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.submit_timeout_ms),
            retry_max: lookup("VOTE_RETRY_MAX")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_max),
            retry_initial_delay_ms: lookup("VOTE_RETRY_INITIAL_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_initial_delay_ms),
            retry_max_delay_ms: lookup("VOTE_RETRY_MAX_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_max_delay_ms),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Reject settings that cannot work
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid setting.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.submit_timeout_ms == 0 {
            return Err(ConfigError::ZeroSubmitTimeout);
        }
        if self.retry_initial_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigError::RetryDelayInverted {
                initial_ms: self.retry_initial_delay_ms,
                max_ms: self.retry_max_delay_ms,
            });
        }
        Ok(())
    }

    /// Per-attempt submit deadline
    #[must_use]
    pub const fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    /// Backoff policy for transient submission failures
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.retry_max)
            .initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry_max_delay_ms))
            .build()
    }
}
