//! # Dispatcher
//!
//! Reads control messages from the channel, starts one task per request and
//! reports every step of every command back with the request's processing id.
//!
//! ```text
//! ControlMessage::Request ──→ lookup ──→ factory.create ──→ task
//!                                │                           │
//!                          (unknown name)          resume ──┬── Yield    → Continuing
//!                                │                          ├── Complete → Final
//!                                ▼                          └── Err/panic → Failed
//!                      Failed(UnknownCommand)
//!
//! ControlMessage::Cancel    ──→ signal task ──→ Failed(Cancelled)
//! ControlMessage::Malformed ──→ Failed(Malformed)
//! ```
//!
//! Tasks for different processing ids run concurrently and their responses
//! interleave on the channel. Within one id, responses are sent in step
//! order and exactly one terminal response is sent.
//!
//! A cancelled id may be reused at once. Each task's entry in the running
//! table carries a token, so a finishing task only ever removes its own
//! entry and never the cancel handle of a newer command under the same id.

use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::metrics::DispatcherMetrics;
use crate::registry::{CommandFactory, CommandRegistry};
use crate::routine::{Step, StepOutput};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use shared_bus::{ChannelError, EnvelopeReceiver, EnvelopeSender};
use shared_types::{
    ControlMessage, FailureInfo, FailureKind, ProcessingId, ReplyMode, RequestEnvelope,
    ResponseEnvelope, TransferBuffer,
};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Cancel handle of one running command.
struct RunningCommand {
    token: u64,
    cancel: oneshot::Sender<()>,
}

type CancelMap = Mutex<HashMap<ProcessingId, RunningCommand>>;

/// Executes requests received over a channel.
pub struct Dispatcher<S> {
    registry: Arc<CommandRegistry>,
    sender: Arc<S>,
    permits: Arc<Semaphore>,
    running: Arc<CancelMap>,
    next_token: AtomicU64,
    metrics: Arc<DispatcherMetrics>,
}

impl<S> Dispatcher<S>
where
    S: EnvelopeSender<ResponseEnvelope> + 'static,
{
    /// Create a dispatcher that answers on `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        registry: CommandRegistry,
        sender: S,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutorError> {
        config.validate()?;
        Ok(Self {
            registry: Arc::new(registry),
            sender: Arc::new(sender),
            permits: Arc::new(Semaphore::new(config.max_concurrent_commands)),
            running: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(0),
            metrics: Arc::new(DispatcherMetrics::new()),
        })
    }

    /// Shared handle to the dispatcher's counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<DispatcherMetrics> {
        self.metrics.clone()
    }

    /// Commands currently started and not yet terminated.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.running.lock().len()
    }

    /// Run the dispatcher on its own task.
    pub fn spawn<R>(self, receiver: R) -> JoinHandle<()>
    where
        R: EnvelopeReceiver<ControlMessage> + 'static,
    {
        tokio::spawn(async move { self.run(receiver).await })
    }

    /// Process control messages until the channel ends, then wait for the
    /// commands still in flight.
    pub async fn run<R>(&self, mut receiver: R)
    where
        R: EnvelopeReceiver<ControlMessage>,
    {
        info!(commands = self.registry.len(), "Dispatcher started");

        let mut tasks = JoinSet::new();

        while let Some(message) = receiver.recv().await {
            match message {
                ControlMessage::Request(request) => self.handle_request(request, &mut tasks).await,
                ControlMessage::Cancel { processing_id } => self.handle_cancel(processing_id),
                ControlMessage::Malformed {
                    processing_id,
                    reason,
                } => self.handle_malformed(processing_id, &reason).await,
            }

            while let Some(joined) = tasks.try_join_next() {
                log_join_result(joined);
            }
        }

        info!(in_flight = tasks.len(), "Control channel closed, draining commands");

        while let Some(joined) = tasks.join_next().await {
            log_join_result(joined);
        }

        info!("Dispatcher stopped");
    }

    async fn handle_request(&self, request: RequestEnvelope, tasks: &mut JoinSet<()>) {
        let RequestEnvelope {
            processing_id,
            command,
            arguments,
            buffers,
            reply,
        } = request;

        let Some(factory) = self.registry.lookup(&command) else {
            self.metrics.record_unknown();
            warn!(%processing_id, command = %command, "Unknown command");
            if reply == ReplyMode::Stream {
                let response = ResponseEnvelope::failed(processing_id, &FailureInfo::unknown_command(&command));
                if let Err(e) = self.sender.send(response).await {
                    debug!(%processing_id, error = %e, "Unknown-command failure not delivered");
                }
            }
            return;
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut running = self.running.lock();
            if running.contains_key(&processing_id) {
                error!(%processing_id, command = %command, "Processing id already running, request dropped");
                return;
            }
            running.insert(
                processing_id,
                RunningCommand {
                    token,
                    cancel: cancel_tx,
                },
            );
        }

        self.metrics.record_dispatched();
        debug!(%processing_id, command = %command, ?reply, "Dispatching command");

        let task = CommandTask {
            processing_id,
            token,
            reply,
            sender: self.sender.clone(),
            metrics: self.metrics.clone(),
            running: self.running.clone(),
        };
        let span = info_span!("command", %processing_id, command = %command);
        let permits = self.permits.clone();

        tasks.spawn(
            task.drive(factory, arguments, buffers, permits, CancelSignal::new(cancel_rx))
                .instrument(span),
        );
    }

    fn handle_cancel(&self, processing_id: ProcessingId) {
        match self.running.lock().remove(&processing_id) {
            Some(command) => {
                debug!(%processing_id, "Cancelling command");
                let _ = command.cancel.send(());
            }
            None => debug!(%processing_id, "Cancel for unknown or finished command ignored"),
        }
    }

    async fn handle_malformed(&self, processing_id: ProcessingId, reason: &str) {
        let running = self.running.lock().contains_key(&processing_id);
        if running {
            error!(%processing_id, reason, "Malformed request names a running processing id, dropped");
            return;
        }

        self.metrics.record_malformed();
        warn!(%processing_id, reason, "Malformed request");
        let failure = FailureInfo::new(FailureKind::Malformed, format!("malformed request: {reason}"));
        if let Err(e) = self.sender.send(ResponseEnvelope::failed(processing_id, &failure)).await {
            debug!(%processing_id, error = %e, "Malformed-request failure not delivered");
        }
    }
}

fn log_join_result(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = %e, "Command task panicked outside a routine");
        }
    }
}

/// How a command ended.
enum Outcome {
    Completed(StepOutput),
    Failed(FailureInfo),
    Cancelled,
    /// The controller stopped listening; nothing more can be reported.
    Disconnected,
}

/// Receiving end of a command's cancel handle.
///
/// Resolves only when a cancel was sent. A handle dropped without sending
/// leaves it pending for good.
struct CancelSignal {
    rx: Option<oneshot::Receiver<()>>,
}

impl CancelSignal {
    fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Cancel safe: dropping the future before it resolves loses nothing.
    async fn cancelled(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            let sent = rx.await.is_ok();
            self.rx = None;
            if sent {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

/// State owned by one command's task.
struct CommandTask<S> {
    processing_id: ProcessingId,
    token: u64,
    reply: ReplyMode,
    sender: Arc<S>,
    metrics: Arc<DispatcherMetrics>,
    running: Arc<CancelMap>,
}

impl<S> CommandTask<S>
where
    S: EnvelopeSender<ResponseEnvelope> + 'static,
{
    async fn drive(
        self,
        factory: Arc<dyn CommandFactory>,
        arguments: Vec<Value>,
        buffers: Vec<TransferBuffer>,
        permits: Arc<Semaphore>,
        mut cancel: CancelSignal,
    ) {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            permit = permits.acquire_owned() => Some(permit),
        };

        let outcome = match permit {
            None => Outcome::Cancelled,
            Some(Ok(permit)) => {
                let outcome = self.execute(factory, arguments, buffers, &mut cancel).await;
                drop(permit);
                outcome
            }
            Some(Err(_)) => Outcome::Failed(FailureInfo::new(
                FailureKind::Execution,
                "executor shutting down",
            )),
        };

        self.release();
        self.finish(outcome).await;
    }

    /// Drop this task's running entry, unless a newer command owns the id.
    fn release(&self) {
        let mut running = self.running.lock();
        if running
            .get(&self.processing_id)
            .is_some_and(|command| command.token == self.token)
        {
            running.remove(&self.processing_id);
        }
    }

    async fn execute(
        &self,
        factory: Arc<dyn CommandFactory>,
        arguments: Vec<Value>,
        buffers: Vec<TransferBuffer>,
        cancel: &mut CancelSignal,
    ) -> Outcome {
        let created = panic::catch_unwind(AssertUnwindSafe(|| factory.create(arguments, buffers)));
        let mut routine = match created {
            Ok(Ok(routine)) => routine,
            Ok(Err(e)) => return Outcome::Failed(e.to_failure()),
            Err(payload) => return Outcome::Failed(panicked(payload.as_ref())),
        };

        loop {
            let resumed = tokio::select! {
                biased;
                () = cancel.cancelled() => return Outcome::Cancelled,
                resumed = AssertUnwindSafe(routine.resume()).catch_unwind() => resumed,
            };

            match resumed {
                Ok(Ok(Step::Yield(output))) => {
                    self.metrics.record_step();
                    let response =
                        ResponseEnvelope::continuing(self.processing_id, output.value, output.buffers);
                    match self.emit(response).await {
                        Ok(()) => {}
                        Err(ChannelError::Closed) => return Outcome::Disconnected,
                        Err(e) => {
                            return Outcome::Failed(FailureInfo::new(
                                FailureKind::Execution,
                                format!("step result could not be sent: {e}"),
                            ))
                        }
                    }
                    tokio::task::yield_now().await;
                }
                Ok(Ok(Step::Complete(output))) => return Outcome::Completed(output),
                Ok(Err(e)) => return Outcome::Failed(e.to_failure()),
                Err(payload) => return Outcome::Failed(panicked(payload.as_ref())),
            }
        }
    }

    async fn finish(&self, outcome: Outcome) {
        let id = self.processing_id;
        let response = match outcome {
            Outcome::Completed(output) => {
                self.metrics.record_completed();
                debug!("Command completed");
                ResponseEnvelope::complete(id, output.value, output.buffers)
            }
            Outcome::Failed(failure) => {
                self.metrics.record_failed();
                warn!(kind = %failure.kind, message = %failure.message, "Command failed");
                ResponseEnvelope::failed(id, &failure)
            }
            Outcome::Cancelled => {
                self.metrics.record_cancelled();
                debug!("Command cancelled");
                ResponseEnvelope::failed(id, &FailureInfo::new(FailureKind::Cancelled, "cancelled by controller"))
            }
            Outcome::Disconnected => {
                debug!("Controller gone, command abandoned");
                return;
            }
        };

        if let Err(e) = self.emit(response).await {
            debug!(error = %e, "Terminal response not delivered");
        }
    }

    async fn emit(&self, response: ResponseEnvelope) -> Result<(), ChannelError> {
        if self.reply == ReplyMode::Discard {
            return Ok(());
        }
        self.sender.send(response).await
    }
}

fn panicked(payload: &(dyn Any + Send)) -> FailureInfo {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "command panicked".to_string()
    };
    FailureInfo::new(FailureKind::Panicked, message)
}
