//! # Pending Slots
//!
//! A pending slot is a single-shot future for one not-yet-delivered response.
//! It is split in two halves:
//!
//! ```text
//! PendingSlot (resolver)            SlotReceiver (awaited by the Resulter)
//!   resolve(item) ──────oneshot──────→  .await → Ok(item)
//!   reject(error) ──────oneshot──────→  .await → Err(error)
//! ```
//!
//! The resolver fulfils at most once; later calls are no-ops that return
//! `false`.

use crate::error::StreamError;
use serde_json::Value;
use shared_types::TransferBuffer;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Reason reported when a slot's resolver is dropped without fulfilling it.
pub const ABANDONED_REASON: &str = "pending slot abandoned";

/// One successful result pulled from a request's stream.
#[derive(Debug, PartialEq)]
pub struct StreamItem {
    /// `true` for the final value; no further items follow.
    pub done: bool,
    pub value: Value,
    /// Buffers moved back from the executor with this result.
    pub buffers: Vec<TransferBuffer>,
}

impl StreamItem {
    pub fn new(done: bool, value: Value, buffers: Vec<TransferBuffer>) -> Self {
        Self {
            done,
            value,
            buffers,
        }
    }
}

type SlotOutcome = Result<StreamItem, StreamError>;

/// Resolving half of a pending slot.
#[derive(Debug)]
pub struct PendingSlot {
    sender: Option<oneshot::Sender<SlotOutcome>>,
}

/// Awaiting half of a pending slot.
#[derive(Debug)]
pub struct SlotReceiver {
    receiver: oneshot::Receiver<SlotOutcome>,
}

/// Create a fresh, unfulfilled slot.
#[must_use]
pub fn pending_slot() -> (PendingSlot, SlotReceiver) {
    let (tx, rx) = oneshot::channel();
    (PendingSlot { sender: Some(tx) }, SlotReceiver { receiver: rx })
}

impl PendingSlot {
    /// Fulfil with a value. Returns `false` if already fulfilled.
    pub fn resolve(&mut self, item: StreamItem) -> bool {
        self.fulfil(Ok(item))
    }

    /// Fulfil with an error. Returns `false` if already fulfilled.
    pub fn reject(&mut self, error: StreamError) -> bool {
        self.fulfil(Err(error))
    }

    fn fulfil(&mut self, outcome: SlotOutcome) -> bool {
        match self.sender.take() {
            Some(sender) => {
                // The receiver may already be gone; the slot still counts as fulfilled.
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }
}

impl Future for SlotReceiver {
    type Output = SlotOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(StreamError::TransportClosed {
                    reason: ABANDONED_REASON.to_string(),
                })
            })
        })
    }
}
