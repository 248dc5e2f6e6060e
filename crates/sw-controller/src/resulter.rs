//! # Resulter
//!
//! Caller-facing handle for one request's ordered result stream.
//!
//! ```text
//! next() ──→ pop head slot ──→ await ──→ Ok(StreamItem { done: false, .. })
//!                                    ──→ Ok(StreamItem { done: true, .. })  ─┐
//!                                    ──→ Err(StreamError)                   ─┤
//!                                                                            ▼
//!                                                           registry.close_if_drained(id)
//! ```
//!
//! `next()` is cancel-safe: if its future is dropped while waiting, the slot
//! it was waiting on is kept and the next call resumes waiting on it.

use crate::error::{ControllerError, StreamError};
use crate::queue::SharedQueue;
use crate::registry::Registry;
use crate::slot::{SlotReceiver, StreamItem};
use futures::stream::{self, Stream};
use shared_bus::EnvelopeSender;
use shared_types::{ControlMessage, ProcessingId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Control-direction sender shared by a controller and its Resulters.
pub type ControlSender = Arc<dyn EnvelopeSender<ControlMessage>>;

/// Pull-based result stream for one request.
pub struct Resulter {
    processing_id: ProcessingId,
    queue: SharedQueue,
    registry: Arc<Registry>,
    control: ControlSender,
    /// Head slot taken from the queue but not yet fulfilled.
    current: Option<SlotReceiver>,
    finished: bool,
}

impl Resulter {
    pub(crate) fn new(
        processing_id: ProcessingId,
        queue: SharedQueue,
        registry: Arc<Registry>,
        control: ControlSender,
    ) -> Self {
        Self {
            processing_id,
            queue,
            registry,
            control,
            current: None,
            finished: false,
        }
    }

    #[must_use]
    pub fn processing_id(&self) -> ProcessingId {
        self.processing_id
    }

    /// Whether the terminal outcome has been returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the next result in arrival order.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Failed`] if the executor reported a failure
    /// - [`StreamError::TransportClosed`] if the channel closed first
    /// - [`StreamError::AlreadyFinished`] if the terminal outcome was
    ///   already returned
    pub async fn next(&mut self) -> Result<StreamItem, StreamError> {
        if self.finished {
            return Err(StreamError::AlreadyFinished);
        }

        if self.current.is_none() {
            self.current = self.queue.lock().pop();
        }
        let Some(slot) = self.current.as_mut() else {
            self.finished = true;
            return Err(StreamError::AlreadyFinished);
        };

        let outcome = slot.await;
        self.current = None;

        let terminal = match &outcome {
            Ok(item) => item.done,
            Err(_) => true,
        };
        if terminal {
            self.finished = true;
            self.registry.close_if_drained(self.processing_id);
        }
        outcome
    }

    /// Consume intermediate results and return only the terminal one.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next).
    pub async fn drain(&mut self) -> Result<StreamItem, StreamError> {
        loop {
            let item = self.next().await?;
            if item.done {
                return Ok(item);
            }
        }
    }

    /// Ask the executor to stop the command.
    ///
    /// The request then terminates with a `Cancelled` failure, observed
    /// through `next()` as usual. Does nothing once the terminal response
    /// has arrived.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Channel`] if the cancel could not be sent.
    pub async fn cancel(&self) -> Result<(), ControllerError> {
        if self.finished || self.queue.lock().is_terminated() {
            return Ok(());
        }
        debug!(processing_id = %self.processing_id, "Sending cancel");
        self.control
            .send(ControlMessage::Cancel {
                processing_id: self.processing_id,
            })
            .await?;
        Ok(())
    }

    /// Adapt into a `Stream` that ends after the terminal item.
    pub fn into_stream(self) -> impl Stream<Item = Result<StreamItem, StreamError>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut resulter = state?;
            let outcome = resulter.next().await;
            let end = resulter.is_finished();
            Some((outcome, (!end).then_some(resulter)))
        })
    }
}

impl fmt::Debug for Resulter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resulter")
            .field("processing_id", &self.processing_id)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Drop for Resulter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        // The id stays reserved until the executor's terminal response.
        if !self.registry.abandon(self.processing_id, &self.queue) {
            return;
        }

        // Best effort: the executor stops a command nobody is listening to.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let control = self.control.clone();
            let processing_id = self.processing_id;
            handle.spawn(async move {
                if let Err(e) = control.send(ControlMessage::Cancel { processing_id }).await {
                    debug!(%processing_id, error = %e, "Cancel for dropped Resulter not sent");
                }
            });
        }
    }
}
