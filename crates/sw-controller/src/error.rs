//! Controller error types.

use shared_bus::ChannelError;
use shared_types::{FailureInfo, ProcessingId, TransferError};
use thiserror::Error;

/// Errors observed while reading a request's result stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The executor terminated the request with a failure.
    #[error("Request failed ({0})")]
    Failed(FailureInfo),

    /// The channel closed before the request terminated.
    #[error("Transport closed: {reason}")]
    TransportClosed { reason: String },

    /// `next()` was called after the terminal outcome was already returned.
    #[error("Result stream already finished")]
    AlreadyFinished,
}

impl StreamError {
    /// The executor's failure description, if this is an executor failure.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureInfo> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_transport_closed(&self) -> bool {
        matches!(self, Self::TransportClosed { .. })
    }
}

/// Errors issuing requests.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A request with this id is still open.
    #[error("Processing id {0} is already open")]
    DuplicateProcessingId(ProcessingId),

    /// The controller was shut down; no further requests are accepted.
    #[error("Controller closed: {0}")]
    Closed(String),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A sender-side buffer still held memory after its request was sent.
    #[error("Transfer defect: {0}")]
    Transfer(#[from] TransferError),

    #[error("Invalid controller configuration: {0}")]
    InvalidConfig(String),
}
