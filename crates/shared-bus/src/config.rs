//! Channel configuration.

use crate::channel::ChannelError;
use crate::{DEFAULT_CHANNEL_CAPACITY, MAX_CHANNEL_CAPACITY};
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for one duplex channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Envelopes buffered per direction before senders wait.
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ChannelConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SW_CHANNEL_CAPACITY`: per-direction capacity (default: 1000)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let capacity = env::var("SW_CHANNEL_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        Self { capacity }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidConfig`] if the capacity is zero or
    /// above [`MAX_CHANNEL_CAPACITY`].
    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.capacity == 0 {
            return Err(ChannelError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if self.capacity > MAX_CHANNEL_CAPACITY {
            return Err(ChannelError::InvalidConfig(format!(
                "capacity {} exceeds maximum {MAX_CHANNEL_CAPACITY}",
                self.capacity
            )));
        }
        Ok(())
    }
}
