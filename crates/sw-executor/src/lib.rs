//! # Stepwire Executor
//!
//! The receiving side of the protocol. Command routines are registered by
//! name; the [`Dispatcher`] starts one for each request it reads from the
//! channel and reports every intermediate result, the final value, or the
//! failure back to the controller.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = CommandRegistry::new().with("count_up", count_up);
//! let (controller, executor) = shared_bus::duplex(&ChannelConfig::default());
//! let (sender, receiver) = executor.split();
//!
//! Dispatcher::new(registry, sender, ExecutorConfig::default())?.spawn(receiver);
//! ```
//!
//! ## Guarantees
//!
//! - A routine is resumed only after its previous step's response was sent.
//! - Exactly one terminal response is sent per request, whether the routine
//!   completes, returns an error, panics or is cancelled.
//! - A failure in one command never affects another.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod routine;

pub use config::ExecutorConfig;
pub use dispatcher::Dispatcher;
pub use error::{CommandError, ExecutorError};
pub use metrics::{DispatcherMetrics, DispatcherMetricsSnapshot};
pub use registry::{CommandFactory, CommandRegistry, RoutineResult};
pub use routine::{CommandRoutine, FnRoutine, ScriptedRoutine, Step, StepOutput};
