//! # Framed Channel
//!
//! Carries envelopes as encoded byte frames, the way a pipe or socket between
//! two processes would. Buffers are necessarily copied into the frame here;
//! ownership on each side still follows the move discipline.
//!
//! A frame whose message does not decode but still names a processing id is
//! replaced by a stand-in envelope (see [`MalformedEnvelope`]) so that request
//! fails instead of hanging. Frames without a readable id are dropped and
//! logged.

use crate::channel::{ChannelError, EnvelopeReceiver, EnvelopeSender};
use crate::config::ChannelConfig;
use crate::memory::{channel, Endpoint, MemoryReceiver, MemorySender};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{ControlMessage, JsonCodec, MalformedEnvelope, ResponseEnvelope};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Sender that encodes envelopes into frames.
pub struct FramedSender<T> {
    inner: MemorySender<Vec<u8>>,
    codec: JsonCodec,
    _phantom: PhantomData<fn(T)>,
}

impl<T> Clone for FramedSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            codec: self.codec,
            _phantom: PhantomData,
        }
    }
}

impl<T> FramedSender<T> {
    pub fn new(inner: MemorySender<Vec<u8>>) -> Self {
        Self {
            inner,
            codec: JsonCodec,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Serialize + Send + 'static> EnvelopeSender<T> for FramedSender<T> {
    async fn send(&self, envelope: T) -> Result<(), ChannelError> {
        let frame = self
            .codec
            .encode(&envelope)
            .map_err(|e| ChannelError::Encode(e.to_string()))?;
        self.inner.send(frame).await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Receiver that decodes frames back into envelopes.
pub struct FramedReceiver<T> {
    inner: MemoryReceiver<Vec<u8>>,
    codec: JsonCodec,
    /// Frames dropped because they could not be decoded.
    dropped: u64,
    /// Undecodable messages replaced by a stand-in for their processing id.
    recovered: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> FramedReceiver<T> {
    pub fn new(inner: MemoryReceiver<Vec<u8>>) -> Self {
        Self {
            inner,
            codec: JsonCodec,
            dropped: 0,
            recovered: 0,
            _phantom: PhantomData,
        }
    }

    /// Number of malformed frames dropped so far.
    #[must_use]
    pub fn frames_dropped(&self) -> u64 {
        self.dropped
    }

    /// Number of malformed messages reported against their processing id.
    #[must_use]
    pub fn frames_recovered(&self) -> u64 {
        self.recovered
    }
}

#[async_trait]
impl<T> EnvelopeReceiver<T> for FramedReceiver<T>
where
    T: DeserializeOwned + MalformedEnvelope + Send + 'static,
{
    async fn recv(&mut self) -> Option<T> {
        loop {
            let Some(bytes) = self.inner.recv().await else {
                debug!(
                    dropped = self.frames_dropped(),
                    recovered = self.frames_recovered(),
                    "Framed channel ended"
                );
                return None;
            };
            let frame = match self.codec.decode_frame(&bytes) {
                Ok(frame) => frame,
                Err(e) => {
                    self.dropped += 1;
                    warn!(error = %e, len = bytes.len(), "Dropping malformed frame");
                    continue;
                }
            };

            match self.codec.decode_message(&frame) {
                Ok(envelope) => return Some(envelope),
                Err(e) => match T::from_malformed(&frame.message, &e.to_string()) {
                    Some(envelope) => {
                        self.recovered += 1;
                        warn!(error = %e, "Malformed message, failing its processing id");
                        return Some(envelope);
                    }
                    None => {
                        self.dropped += 1;
                        warn!(error = %e, len = bytes.len(), "Dropping malformed frame without processing id");
                    }
                },
            }
        }
    }
}

/// Controller side of a framed duplex.
pub type FramedControllerEndpoint =
    Endpoint<FramedSender<ControlMessage>, FramedReceiver<ResponseEnvelope>>;

/// Executor side of a framed duplex.
pub type FramedExecutorEndpoint =
    Endpoint<FramedSender<ResponseEnvelope>, FramedReceiver<ControlMessage>>;

/// Create a controller/executor duplex that carries encoded frames.
///
/// Also returns raw byte senders into each direction so callers can inject
/// arbitrary frames (used to exercise malformed input handling).
#[must_use]
pub fn framed_duplex(
    config: &ChannelConfig,
) -> (
    FramedControllerEndpoint,
    FramedExecutorEndpoint,
    RawInjectors,
) {
    let (request_tx, request_rx) = channel::<Vec<u8>>(config.capacity);
    let (response_tx, response_rx) = channel::<Vec<u8>>(config.capacity);

    let injectors = RawInjectors {
        to_executor: request_tx.clone(),
        to_controller: response_tx.clone(),
    };

    (
        Endpoint {
            sender: FramedSender::new(request_tx),
            receiver: FramedReceiver::new(response_rx),
        },
        Endpoint {
            sender: FramedSender::new(response_tx),
            receiver: FramedReceiver::new(request_rx),
        },
        injectors,
    )
}

/// Raw byte senders into a framed duplex.
///
/// Holding these keeps the corresponding directions open.
pub struct RawInjectors {
    pub to_executor: MemorySender<Vec<u8>>,
    pub to_controller: MemorySender<Vec<u8>>,
}
