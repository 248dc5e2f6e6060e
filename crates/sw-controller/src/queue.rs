//! # Result Queue
//!
//! FIFO of pending slots for one request.
//!
//! ```text
//!          head (Resulter pops)                    tail (Registry resolves)
//!   slots: [ SlotReceiver, SlotReceiver, ... ]     tail: Option<PendingSlot>
//! ```
//!
//! The queue starts with exactly one slot. Each matched `Continuing`
//! response resolves the tail and appends a fresh slot; a terminal response
//! resolves or rejects the tail and appends nothing. Once terminated, the
//! queue accepts no further responses.

use crate::error::StreamError;
use crate::slot::{pending_slot, PendingSlot, SlotReceiver, StreamItem};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A queue shared between the registry entry and its Resulter.
pub type SharedQueue = Arc<Mutex<ResultQueue>>;

#[derive(Debug)]
pub struct ResultQueue {
    slots: VecDeque<SlotReceiver>,
    /// The only slot that can still be fulfilled. `None` once terminated.
    tail: Option<PendingSlot>,
}

impl Default for ResultQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultQueue {
    /// Create a queue holding one pending slot.
    #[must_use]
    pub fn new() -> Self {
        let (slot, receiver) = pending_slot();
        Self {
            slots: VecDeque::from([receiver]),
            tail: Some(slot),
        }
    }

    #[must_use]
    pub fn shared() -> SharedQueue {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Fulfil the pending slot with `item`.
    ///
    /// Returns `false` if the queue was already terminated.
    pub fn fulfil(&mut self, item: StreamItem) -> bool {
        let Some(mut slot) = self.tail.take() else {
            return false;
        };
        let done = item.done;
        slot.resolve(item);
        if !done {
            let (next, receiver) = pending_slot();
            self.slots.push_back(receiver);
            self.tail = Some(next);
        }
        true
    }

    /// Reject the pending slot and terminate the queue.
    ///
    /// Returns `false` if the queue was already terminated.
    pub fn reject(&mut self, error: StreamError) -> bool {
        match self.tail.take() {
            Some(mut slot) => slot.reject(error),
            None => false,
        }
    }

    /// Remove the head slot.
    pub fn pop(&mut self) -> Option<SlotReceiver> {
        self.slots.pop_front()
    }

    /// Whether a terminal response has been matched.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.tail.is_none()
    }

    /// Terminated and every slot handed to the consumer.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.is_terminated() && self.slots.is_empty()
    }

    /// Number of unfulfilled slots (zero or one).
    #[must_use]
    pub fn pending(&self) -> usize {
        usize::from(self.tail.is_some())
    }

    /// Slots not yet taken by the consumer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
