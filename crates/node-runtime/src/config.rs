//! # Node Configuration
//!
//! Unified configuration for the channel, both protocol sides and logging.
//! Every section has defaults and can be overridden from the environment.

use shared_bus::{ChannelConfig, ChannelError};
use sw_controller::{ControllerConfig, ControllerError};
use sw_executor::{ExecutorConfig, ExecutorError};
use sw_telemetry::TelemetryConfig;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Duplex channel configuration.
    pub channel: ChannelConfig,
    /// Executor configuration.
    pub executor: ExecutorConfig,
    /// Controller configuration.
    pub controller: ControllerConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Load every section from environment variables.
    ///
    /// - `SW_CHANNEL_CAPACITY`
    /// - `SW_MAX_CONCURRENT_COMMANDS`
    /// - `SW_SERVICE_NAME` (logged with a `-node` suffix), `SW_LOG_LEVEL`/`RUST_LOG`,
    ///   `SW_JSON_LOGS`, `SW_CONSOLE_OUTPUT`
    pub fn from_env() -> Self {
        Self {
            channel: ChannelConfig::from_env(),
            executor: ExecutorConfig::from_env(),
            controller: ControllerConfig::default(),
            telemetry: TelemetryConfig::for_component("node"),
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first section that fails validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.channel.validate()?;
        self.executor.validate()?;
        self.controller.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("executor: {0}")]
    Executor(#[from] ExecutorError),

    #[error("controller: {0}")]
    Controller(#[from] ControllerError),
}
