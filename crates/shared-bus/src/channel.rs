//! # Channel Traits
//!
//! The seams the controller and executor are written against. Any ordered,
//! asynchronous transport can implement them.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from channel operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The receiving side was dropped.
    #[error("Channel closed")]
    Closed,

    /// The envelope could not be encoded for the transport.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// The channel configuration is unusable.
    #[error("Invalid channel configuration: {0}")]
    InvalidConfig(String),
}

/// Sending half of one channel direction.
#[async_trait]
pub trait EnvelopeSender<T: Send + 'static>: Send + Sync {
    /// Send an envelope, waiting for capacity if the channel is full.
    ///
    /// The envelope is moved; on success the caller no longer owns it or any
    /// buffer attached to it.
    async fn send(&self, envelope: T) -> Result<(), ChannelError>;

    /// Whether the receiving side has gone away.
    fn is_closed(&self) -> bool;
}

/// Receiving half of one channel direction.
#[async_trait]
pub trait EnvelopeReceiver<T: Send + 'static>: Send {
    /// Receive the next envelope.
    ///
    /// Returns `None` once every sender has been dropped and the queue is empty.
    async fn recv(&mut self) -> Option<T>;
}
