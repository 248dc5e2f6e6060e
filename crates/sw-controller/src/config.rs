//! Controller configuration.

use crate::error::ControllerError;

/// Reason given to pending requests when the channel closes.
pub const DEFAULT_SHUTDOWN_REASON: &str = "transport closed";

/// Configuration for a [`Controller`](crate::Controller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// First processing id handed out by `open()`.
    pub first_processing_id: u64,
    /// Rejection reason used when the response channel ends.
    pub shutdown_reason: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            first_processing_id: 1,
            shutdown_reason: DEFAULT_SHUTDOWN_REASON.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] if the shutdown reason is empty.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.shutdown_reason.trim().is_empty() {
            return Err(ControllerError::InvalidConfig(
                "shutdown_reason must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
