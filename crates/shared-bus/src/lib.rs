//! # Shared Bus - Envelope Channel
//!
//! The transport between a controller and an executor.
//!
//! ## Contract
//!
//! - Discrete envelopes are delivered asynchronously.
//! - Send order is preserved within one direction of one channel.
//! - Envelopes are moved, so attached buffers change owner without a copy.
//! - When every sender of a direction is dropped the receiver observes the
//!   end of the stream (`recv()` returns `None`).
//!
//! ```text
//! ┌────────────┐   ControlMessage    ┌────────────┐
//! │ Controller │ ──────────────────→ │  Executor  │
//! │            │ ←────────────────── │            │
//! └────────────┘  ResponseEnvelope   └────────────┘
//! ```
//!
//! Two implementations are provided: [`memory`] moves envelopes through
//! in-process queues, [`framed`] encodes them into byte frames as a process
//! boundary would.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod channel;
pub mod config;
pub mod framed;
pub mod memory;

pub use channel::{ChannelError, EnvelopeReceiver, EnvelopeSender};
pub use config::ChannelConfig;
pub use framed::{
    framed_duplex, FramedControllerEndpoint, FramedExecutorEndpoint, FramedReceiver, FramedSender,
    RawInjectors,
};
pub use memory::{channel, duplex, Endpoint, MemoryReceiver, MemorySender};

use shared_types::{ControlMessage, ResponseEnvelope};

/// Maximum envelopes buffered per direction before senders wait.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Largest capacity a bounded direction accepts.
pub const MAX_CHANNEL_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// The controller's side of a duplex: sends control messages, receives responses.
pub type ControllerEndpoint = Endpoint<MemorySender<ControlMessage>, MemoryReceiver<ResponseEnvelope>>;

/// The executor's side of a duplex: sends responses, receives control messages.
pub type ExecutorEndpoint = Endpoint<MemorySender<ResponseEnvelope>, MemoryReceiver<ControlMessage>>;
