//! # Node Runtime
//!
//! Runs a controller and an executor in one process.
//!
//! ```text
//!             ┌──────────── duplex(capacity) ────────────┐
//! Controller ─┤ ControlMessage ───────────→ Dispatcher   │
//!   reader  ←─┤ ResponseEnvelope ←───────── (commands)   │
//!             └──────────────────────────────────────────┘
//! ```
//!
//! ## Shutdown
//!
//! 1. The controller is dropped, closing the control direction
//! 2. The dispatcher finishes in-flight commands and exits
//! 3. The response direction closes and the reader rejects anything pending

use crate::config::{ConfigError, NodeConfig};
use shared_bus::duplex;
use std::sync::Arc;
use sw_controller::{Controller, ControllerError, RegistryStatsSnapshot};
use sw_executor::{CommandRegistry, Dispatcher, DispatcherMetrics, DispatcherMetricsSnapshot};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, Instrument};

/// Errors starting or stopping the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("controller: {0}")]
    Controller(#[from] ControllerError),

    #[error("background task failed: {0}")]
    Task(#[from] JoinError),
}

/// Counters collected at shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub dispatcher: DispatcherMetricsSnapshot,
    pub registry: RegistryStatsSnapshot,
}

/// The main node runtime.
pub struct NodeRuntime {
    controller: Controller,
    metrics: Arc<DispatcherMetrics>,
    dispatcher: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl NodeRuntime {
    /// Validate `config`, wire both sides over a fresh duplex and start them.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if the configuration is invalid.
    pub fn start(config: &NodeConfig, commands: CommandRegistry) -> Result<Self, RuntimeError> {
        config.validate()?;

        let (controller_end, executor_end) = duplex(&config.channel);

        let (response_tx, control_rx) = executor_end.split();
        let dispatcher = Dispatcher::new(commands, response_tx, config.executor.clone())
            .map_err(ConfigError::from)?;
        let metrics = dispatcher.metrics();
        let dispatcher = tokio::spawn(
            async move { dispatcher.run(control_rx).await }
                .instrument(sw_telemetry::component_span!("executor", "dispatch")),
        );

        let (control_tx, response_rx) = controller_end.split();
        let controller = Controller::new(control_tx, config.controller.clone())?;
        let reader = controller.spawn_reader(response_rx);

        info!(
            capacity = config.channel.capacity,
            max_concurrent_commands = config.executor.max_concurrent_commands,
            "Node runtime started"
        );

        Ok(Self {
            controller,
            metrics,
            dispatcher,
            reader,
        })
    }

    #[must_use]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[must_use]
    pub fn dispatcher_metrics(&self) -> DispatcherMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop both sides and wait for them.
    ///
    /// Outstanding Resulters keep the control direction open; drop them
    /// first or this waits until they are gone.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Task`] if a background task panicked.
    pub async fn shutdown(self) -> Result<ShutdownReport, RuntimeError> {
        info!("Shutting down node runtime");

        let registry = self.controller.registry().clone();
        drop(self.controller);

        self.dispatcher.await?;
        self.reader.await?;

        let report = ShutdownReport {
            dispatcher: self.metrics.snapshot(),
            registry: registry.stats(),
        };
        info!(
            completed = report.dispatcher.completed,
            failed = report.dispatcher.failed,
            rejected = report.registry.rejected,
            "Node runtime stopped"
        );
        Ok(report)
    }
}
