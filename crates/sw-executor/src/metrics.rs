//! Dispatcher counters.
//!
//! Thread-safe counters shared between the run loop and the per-command tasks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for dispatched commands and their outcomes.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Requests that resolved to a registered routine
    pub dispatched: AtomicU64,
    /// Intermediate results produced
    pub steps: AtomicU64,
    /// Commands that produced a final value
    pub completed: AtomicU64,
    /// Commands that terminated with an error or panic
    pub failed: AtomicU64,
    /// Requests naming an unregistered command
    pub unknown: AtomicU64,
    /// Commands stopped by a cancel message
    pub cancelled: AtomicU64,
    /// Undecodable requests answered with a malformed failure
    pub malformed: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown(&self) {
        self.unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    #[must_use]
    pub fn snapshot(&self) -> DispatcherMetricsSnapshot {
        DispatcherMetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            steps: self.steps.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatcherMetricsSnapshot {
    pub dispatched: u64,
    pub steps: u64,
    pub completed: u64,
    pub failed: u64,
    pub unknown: u64,
    pub cancelled: u64,
    pub malformed: u64,
}

impl DispatcherMetricsSnapshot {
    /// Commands that reached a terminal response of any kind.
    #[must_use]
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.unknown + self.cancelled + self.malformed
    }
}
