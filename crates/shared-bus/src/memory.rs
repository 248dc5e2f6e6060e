//! # In-Memory Channel
//!
//! Bounded `tokio::sync::mpsc` queues. Envelopes are moved through the queue,
//! so a buffer's heap allocation arrives at the receiver unchanged.

use crate::channel::{ChannelError, EnvelopeReceiver, EnvelopeSender};
use crate::config::ChannelConfig;
use crate::{ControllerEndpoint, ExecutorEndpoint, MAX_CHANNEL_CAPACITY};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Sending half of an in-memory channel.
pub struct MemorySender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> Clone for MemorySender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> EnvelopeSender<T> for MemorySender<T> {
    async fn send(&self, envelope: T) -> Result<(), ChannelError> {
        self.inner.send(envelope).await.map_err(|_| {
            debug!("Envelope dropped (receiver closed)");
            ChannelError::Closed
        })
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Receiving half of an in-memory channel.
pub struct MemoryReceiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T> MemoryReceiver<T> {
    /// Receive without waiting.
    ///
    /// Returns `None` if nothing is queued right now or the channel is closed.
    pub fn try_recv(&mut self) -> Option<T> {
        self.inner.try_recv().ok()
    }

    /// Stop accepting new envelopes. Queued envelopes can still be received.
    pub fn close(&mut self) {
        self.inner.close();
    }

    /// Convert into a `tokio_stream::Stream` for use with stream combinators.
    #[must_use]
    pub fn into_stream(self) -> ReceiverStream<T> {
        ReceiverStream::new(self.inner)
    }
}

#[async_trait]
impl<T: Send + 'static> EnvelopeReceiver<T> for MemoryReceiver<T> {
    async fn recv(&mut self) -> Option<T> {
        self.inner.recv().await
    }
}

/// Create one bounded direction.
///
/// The capacity is clamped to `1..=MAX_CHANNEL_CAPACITY`.
#[must_use]
pub fn channel<T>(capacity: usize) -> (MemorySender<T>, MemoryReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_CHANNEL_CAPACITY));
    (
        MemorySender { inner: tx },
        MemoryReceiver { inner: rx },
    )
}

/// One side of a duplex channel.
pub struct Endpoint<S, R> {
    pub sender: S,
    pub receiver: R,
}

impl<S, R> Endpoint<S, R> {
    /// Split into sender and receiver.
    pub fn split(self) -> (S, R) {
        (self.sender, self.receiver)
    }
}

/// Create a controller/executor duplex with `config.capacity` per direction.
#[must_use]
pub fn duplex(config: &ChannelConfig) -> (ControllerEndpoint, ExecutorEndpoint) {
    let (request_tx, request_rx) = channel(config.capacity);
    let (response_tx, response_rx) = channel(config.capacity);

    debug!(capacity = config.capacity, "Duplex channel created");

    (
        Endpoint {
            sender: request_tx,
            receiver: response_rx,
        },
        Endpoint {
            sender: response_tx,
            receiver: request_rx,
        },
    )
}
