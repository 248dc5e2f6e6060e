//! Executor configuration.

use crate::error::ExecutorError;
use serde::{Deserialize, Serialize};
use std::env;
use tokio::sync::Semaphore;

/// Default limit on commands being resumed at the same time.
pub const DEFAULT_MAX_CONCURRENT_COMMANDS: usize = 64;

/// Configuration for the [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Commands allowed to run at once. Further requests wait for a permit
    /// but are still accepted off the channel.
    pub max_concurrent_commands: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_commands: DEFAULT_MAX_CONCURRENT_COMMANDS,
        }
    }
}

impl ExecutorConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SW_MAX_CONCURRENT_COMMANDS`: concurrency limit (default: 64)
    pub fn from_env() -> Self {
        let max_concurrent_commands = env::var("SW_MAX_CONCURRENT_COMMANDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENT_COMMANDS);
        Self {
            max_concurrent_commands,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidConfig`] if the limit is zero or
    /// above what a semaphore can hand out.
    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.max_concurrent_commands == 0 {
            return Err(ExecutorError::InvalidConfig(
                "max_concurrent_commands must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_commands > Semaphore::MAX_PERMITS {
            return Err(ExecutorError::InvalidConfig(format!(
                "max_concurrent_commands {} exceeds maximum {}",
                self.max_concurrent_commands,
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}
