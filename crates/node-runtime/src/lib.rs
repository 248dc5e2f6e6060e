//! # Node Runtime Library
//!
//! Exposes the pieces of the `stepwire-node` binary for tests and embedders.
//!
//! - `config/` - Unified [`NodeConfig`] with environment overrides
//! - `commands/` - Built-in command routines and [`builtin_registry`]
//! - `runtime/` - [`NodeRuntime`]: controller and executor wired over one duplex

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod commands;
pub mod config;
pub mod runtime;

pub use commands::builtin_registry;
pub use config::{ConfigError, NodeConfig};
pub use runtime::{NodeRuntime, RuntimeError, ShutdownReport};
