//! # Controller
//!
//! Issues requests and hands out one [`Resulter`] per request.
//!
//! ```text
//! open(command, args, buffers)
//!   1. allocate processing id, skipping ids still in the registry
//!   2. registry.open(id)          → result queue with one pending slot
//!   3. send ControlMessage::Request
//!   4. return Resulter
//!
//! If step 3 fails or the open future is dropped mid-send, the entry from
//! step 2 is removed again.
//!
//! reader loop (spawn_reader)
//!   for each response: registry.deliver(response)
//!   on channel end:    registry.reject_all_pending(shutdown_reason)
//! ```

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::queue::SharedQueue;
use crate::registry::{Registry, RegistryStatsSnapshot};
use crate::resulter::{ControlSender, Resulter};
use serde_json::Value;
use shared_bus::{EnvelopeReceiver, EnvelopeSender};
use shared_types::{
    detach_all, verify_transferred, ControlMessage, ProcessingId, ReplyMode, RequestEnvelope,
    ResponseEnvelope, TransferBuffer,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Controller side of one channel.
pub struct Controller {
    control: ControlSender,
    registry: Arc<Registry>,
    next_id: AtomicU64,
    config: ControllerConfig,
}

impl Controller {
    /// Create a controller sending requests on `sender`.
    ///
    /// Responses are routed only once a reader is running; see
    /// [`spawn_reader`](Self::spawn_reader).
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] if `config` fails validation.
    pub fn new<S>(sender: S, config: ControllerConfig) -> Result<Self, ControllerError>
    where
        S: EnvelopeSender<ControlMessage> + 'static,
    {
        config.validate()?;
        Ok(Self {
            control: Arc::new(sender),
            registry: Arc::new(Registry::new()),
            next_id: AtomicU64::new(config.first_processing_id),
            config,
        })
    }

    /// Create a controller and start its reader on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] if `config` fails validation.
    pub fn start<S, R>(
        sender: S,
        receiver: R,
        config: ControllerConfig,
    ) -> Result<(Self, JoinHandle<()>), ControllerError>
    where
        S: EnvelopeSender<ControlMessage> + 'static,
        R: EnvelopeReceiver<ResponseEnvelope> + 'static,
    {
        let controller = Self::new(sender, config)?;
        let reader = controller.spawn_reader(receiver);
        Ok((controller, reader))
    }

    /// Route responses from `receiver` until it ends, then reject whatever
    /// is still pending.
    pub fn spawn_reader<R>(&self, receiver: R) -> JoinHandle<()>
    where
        R: EnvelopeReceiver<ResponseEnvelope> + 'static,
    {
        let registry = self.registry.clone();
        let reason = self.config.shutdown_reason.clone();
        tokio::spawn(read_responses(registry, receiver, reason))
    }

    /// Issue a streaming request for `command`.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::Closed`] after the channel has ended
    /// - [`ControllerError::Channel`] if the request could not be sent
    pub async fn open(
        &self,
        command: &str,
        arguments: Vec<Value>,
        buffers: Vec<TransferBuffer>,
    ) -> Result<Resulter, ControllerError> {
        let (id, queue) = self.reserve()?;
        self.send_request(id, queue, command, arguments, buffers).await
    }

    /// Issue a streaming request under a caller-chosen processing id.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::DuplicateProcessingId`] if `id` is still
    /// open, otherwise as [`open`](Self::open).
    pub async fn open_as(
        &self,
        id: ProcessingId,
        command: &str,
        arguments: Vec<Value>,
        buffers: Vec<TransferBuffer>,
    ) -> Result<Resulter, ControllerError> {
        let queue = self.registry.open(id)?;
        self.send_request(id, queue, command, arguments, buffers).await
    }

    async fn send_request(
        &self,
        id: ProcessingId,
        queue: SharedQueue,
        command: &str,
        arguments: Vec<Value>,
        buffers: Vec<TransferBuffer>,
    ) -> Result<Resulter, ControllerError> {
        let guard = OpenGuard::new(&self.registry, id, queue);

        let request = RequestEnvelope::new(id, command, arguments).with_buffers(buffers);
        self.control.send(ControlMessage::Request(request)).await?;

        let queue = guard.disarm();
        debug!(processing_id = %id, command, "Request sent");
        Ok(Resulter::new(id, queue, self.registry.clone(), self.control.clone()))
    }

    /// Issue a streaming request, moving the contents of `handles` into it.
    ///
    /// On return every handle is empty.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open), plus [`ControllerError::Transfer`] if a
    /// handle still holds memory after the send.
    pub async fn open_with(
        &self,
        command: &str,
        arguments: Vec<Value>,
        handles: &mut [TransferBuffer],
    ) -> Result<Resulter, ControllerError> {
        let buffers = detach_all(handles);
        let resulter = self.open(command, arguments, buffers).await?;
        verify_transferred(handles.iter())?;
        Ok(resulter)
    }

    /// Fire-and-forget: run `command` without observing any result.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Channel`] if the request could not be sent.
    pub async fn fire(
        &self,
        command: &str,
        arguments: Vec<Value>,
        buffers: Vec<TransferBuffer>,
    ) -> Result<ProcessingId, ControllerError> {
        if self.registry.is_closed() {
            return Err(ControllerError::Closed(self.config.shutdown_reason.clone()));
        }
        let id = loop {
            let id = self.allocate_id();
            if !self.registry.contains(id) {
                break id;
            }
            debug!(processing_id = %id, "Processing id in use, skipped");
        };
        let request = RequestEnvelope::new(id, command, arguments)
            .with_buffers(buffers)
            .with_reply(ReplyMode::Discard);
        self.control.send(ControlMessage::Request(request)).await?;

        debug!(processing_id = %id, command, "Fire-and-forget request sent");
        Ok(id)
    }

    /// Reject every pending request with `reason`. Idempotent.
    pub fn reject_all_pending(&self, reason: &str) -> usize {
        self.registry.reject_all_pending(reason)
    }

    /// Number of requests currently open.
    #[must_use]
    pub fn open_requests(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStatsSnapshot {
        self.registry.stats()
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn allocate_id(&self) -> ProcessingId {
        ProcessingId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Open an entry under the next free processing id.
    ///
    /// Ids taken through `open_as`, or held by an abandoned request, are
    /// skipped.
    fn reserve(&self) -> Result<(ProcessingId, SharedQueue), ControllerError> {
        loop {
            let id = self.allocate_id();
            match self.registry.open(id) {
                Ok(queue) => return Ok((id, queue)),
                Err(ControllerError::DuplicateProcessingId(_)) => {
                    debug!(processing_id = %id, "Processing id in use, skipped");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Removes a freshly opened entry unless its request reached the channel.
struct OpenGuard<'a> {
    registry: &'a Registry,
    id: ProcessingId,
    queue: SharedQueue,
    armed: bool,
}

impl<'a> OpenGuard<'a> {
    fn new(registry: &'a Registry, id: ProcessingId, queue: SharedQueue) -> Self {
        Self {
            registry,
            id,
            queue,
            armed: true,
        }
    }

    fn disarm(mut self) -> SharedQueue {
        self.armed = false;
        self.queue.clone()
    }
}

impl Drop for OpenGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.remove(self.id, &self.queue);
        }
    }
}

/// Reader loop: deliver every response, then reject what is left.
pub async fn read_responses<R>(registry: Arc<Registry>, mut receiver: R, reason: String)
where
    R: EnvelopeReceiver<ResponseEnvelope>,
{
    while let Some(response) = receiver.recv().await {
        registry.deliver(response);
    }

    info!(open = registry.len(), "Response channel ended");
    registry.reject_all_pending(&reason);
}
