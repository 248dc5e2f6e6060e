//! # Stepwire Controller
//!
//! The issuing side of the protocol. Many requests share one channel; each
//! is observed through its own [`Resulter`], an ordered pull-based stream of
//! results terminated by exactly one final value or error.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐ open()  ┌──────────────────────────────┐
//! │   Caller   │ ──────→ │ Controller                   │ ── Request ──→ channel
//! │            │         │   Registry                   │
//! │ Resulter   │ ←─next──│     id → ResultQueue         │ ←─ Response ── reader loop
//! └────────────┘         │          [slot][slot][tail]  │
//!                        └──────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Results for one request are returned in arrival order.
//! - Each pending slot is fulfilled at most once.
//! - A registry entry is removed once its terminal result has been consumed,
//!   or when the channel closes, or when its Resulter is dropped.
//! - When the channel closes every pending request is rejected exactly once.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod controller;
pub mod error;
pub mod queue;
pub mod registry;
pub mod resulter;
pub mod slot;

pub use config::{ControllerConfig, DEFAULT_SHUTDOWN_REASON};
pub use controller::{read_responses, Controller};
pub use error::{ControllerError, StreamError};
pub use queue::{ResultQueue, SharedQueue};
pub use registry::{Registry, RegistryStats, RegistryStatsSnapshot};
pub use resulter::{ControlSender, Resulter};
pub use slot::{pending_slot, PendingSlot, SlotReceiver, StreamItem};
