//! # Controller Registry
//!
//! Multiplexing table of open requests, keyed by processing id.
//!
//! Flow:
//! 1. The controller calls `open()` and receives the request's result queue
//! 2. The request is sent over the channel
//! 3. The reader loop calls `deliver()` for every response that arrives
//! 4. The Resulter pops slots and, after the terminal one, calls
//!    `close_if_drained()` which removes the entry
//! 5. When the channel ends, `reject_all_pending()` fails whatever is left
//!
//! A Resulter dropped before its terminal response calls `abandon()`. The
//! entry then holds its id until the executor's terminal response arrives,
//! so the id cannot be reopened while the old command may still answer.
//!
//! Lock order is always entry table first, then the individual queue.

use crate::error::{ControllerError, StreamError};
use crate::queue::{ResultQueue, SharedQueue};
use crate::slot::StreamItem;
use parking_lot::Mutex;
use shared_types::{Completion, ProcessingId, ResponseEnvelope};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Statistics for the registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total requests opened
    pub opened: AtomicU64,
    /// Responses matched to an open request
    pub delivered: AtomicU64,
    /// Responses for unknown or already terminated ids
    pub discarded: AtomicU64,
    /// Requests that received a final value
    pub completed: AtomicU64,
    /// Requests that received a failure
    pub failed: AtomicU64,
    /// Pending slots rejected by shutdown
    pub rejected: AtomicU64,
    /// Requests whose consumer went away before the terminal response
    pub abandoned: AtomicU64,
}

/// Point-in-time registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStatsSnapshot {
    pub opened: u64,
    pub delivered: u64,
    pub discarded: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub abandoned: u64,
    /// Entries currently in the table
    pub open: usize,
}

struct Entry {
    queue: SharedQueue,
    /// Consumer dropped; responses are discarded until the terminal one.
    abandoned: bool,
}

#[derive(Default)]
struct Entries {
    map: HashMap<ProcessingId, Entry>,
    /// Set by the first `reject_all_pending`.
    closed: Option<String>,
}

/// Table of open requests.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<Entries>,
    stats: RegistryStats,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an entry for `id` holding one pending slot.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::DuplicateProcessingId`] if `id` is still open,
    ///   including an abandoned entry still waiting for its terminal
    /// - [`ControllerError::Closed`] after `reject_all_pending` was called
    pub fn open(&self, id: ProcessingId) -> Result<SharedQueue, ControllerError> {
        let mut entries = self.entries.lock();
        if let Some(reason) = &entries.closed {
            return Err(ControllerError::Closed(reason.clone()));
        }
        if entries.map.contains_key(&id) {
            return Err(ControllerError::DuplicateProcessingId(id));
        }

        let queue = ResultQueue::shared();
        entries.map.insert(
            id,
            Entry {
                queue: queue.clone(),
                abandoned: false,
            },
        );
        self.stats.opened.fetch_add(1, Ordering::Relaxed);

        debug!(processing_id = %id, "Opened request");
        Ok(queue)
    }

    /// Route a response to its request.
    ///
    /// Responses for ids with no entry, or arriving after the entry's
    /// terminal response, are discarded. Returns whether the response was
    /// matched.
    pub fn deliver(&self, response: ResponseEnvelope) -> bool {
        let id = response.processing_id;
        let completion = response.completion;
        let failure = response.failure();

        let mut entries = self.entries.lock();
        let Some(entry) = entries.map.get(&id) else {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(processing_id = %id, ?completion, "Discarding response for unknown id");
            return false;
        };

        if entry.abandoned {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            if completion.is_terminal() {
                entries.map.remove(&id);
                debug!(processing_id = %id, ?completion, "Abandoned request terminated, id released");
            } else {
                debug!(processing_id = %id, ?completion, "Discarding response for abandoned request");
            }
            return false;
        }

        let mut queue = entry.queue.lock();
        let matched = match (completion, failure) {
            (Completion::Failed, Some(failure)) => queue.reject(StreamError::Failed(failure)),
            _ => queue.fulfil(StreamItem::new(
                completion.is_terminal(),
                response.payload,
                response.buffers,
            )),
        };

        if !matched {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            warn!(processing_id = %id, ?completion, "Discarding response after terminal");
            return false;
        }

        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        match completion {
            Completion::Continuing => {}
            Completion::Final => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
            }
            Completion::Failed => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        debug!(processing_id = %id, ?completion, "Delivered response");
        true
    }

    /// Remove the entry for `id` once its terminal slot has been consumed.
    ///
    /// Returns whether the entry was removed.
    pub fn close_if_drained(&self, id: ProcessingId) -> bool {
        let mut entries = self.entries.lock();
        let drained = entries
            .map
            .get(&id)
            .is_some_and(|entry| entry.queue.lock().is_drained());
        if drained {
            entries.map.remove(&id);
            debug!(processing_id = %id, "Closed request");
        }
        drained
    }

    /// Remove the entry for `id` if it still refers to `queue`.
    ///
    /// Used when the request never reached the channel.
    pub fn remove(&self, id: ProcessingId, queue: &SharedQueue) -> bool {
        let mut entries = self.entries.lock();
        let same = entries
            .map
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(&current.queue, queue));
        if same {
            entries.map.remove(&id);
            debug!(processing_id = %id, "Removed unsent request");
        }
        same
    }

    /// Record that the consumer of `id` went away.
    ///
    /// An entry whose terminal response already arrived is removed at once.
    /// Otherwise it stays, holding the id, until the terminal response is
    /// delivered. Returns whether the request is still running and worth
    /// cancelling.
    pub fn abandon(&self, id: ProcessingId, queue: &SharedQueue) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries
            .map
            .get_mut(&id)
            .filter(|current| Arc::ptr_eq(&current.queue, queue))
        else {
            return false;
        };

        if entry.queue.lock().is_terminated() {
            entries.map.remove(&id);
            debug!(processing_id = %id, "Removed finished request after its consumer left");
            return false;
        }

        entry.abandoned = true;
        self.stats.abandoned.fetch_add(1, Ordering::Relaxed);
        debug!(processing_id = %id, "Request abandoned, id held until its terminal response");
        true
    }

    /// Reject every open entry's pending slot with `reason` and close all
    /// entries.
    ///
    /// Entries whose terminal response already arrived keep their results
    /// for the consumer. Only the first call has an effect; it returns the
    /// number of pending slots rejected, later calls return zero.
    pub fn reject_all_pending(&self, reason: &str) -> usize {
        let drained: Vec<(ProcessingId, Entry)> = {
            let mut entries = self.entries.lock();
            if entries.closed.is_some() {
                return 0;
            }
            entries.closed = Some(reason.to_string());
            entries.map.drain().collect()
        };

        let mut rejected = 0;
        for (id, entry) in drained {
            if entry.abandoned {
                continue;
            }
            let error = StreamError::TransportClosed {
                reason: reason.to_string(),
            };
            if entry.queue.lock().reject(error) {
                rejected += 1;
                debug!(processing_id = %id, reason, "Rejected pending slot");
            }
        }

        self.stats.rejected.fetch_add(rejected as u64, Ordering::Relaxed);
        info!(rejected, reason, "Rejected all pending requests");
        rejected
    }

    /// Whether `reject_all_pending` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.entries.lock().closed.is_some()
    }

    #[must_use]
    pub fn contains(&self, id: ProcessingId) -> bool {
        self.entries.lock().map.contains_key(&id)
    }

    /// Number of open entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get statistics
    #[must_use]
    pub fn stats(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            opened: self.stats.opened.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            discarded: self.stats.discarded.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            abandoned: self.stats.abandoned.load(Ordering::Relaxed),
            open: self.len(),
        }
    }
}
