//! Error types for the executor.

use shared_types::{FailureInfo, FailureKind};
use thiserror::Error;

/// Errors raised by command routines and their factories.
///
/// Every variant is reported to the controller as a `Failed` response for
/// the processing id that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing argument at position {0}")]
    MissingArgument(usize),

    #[error("Execution failed: {0}")]
    Execution(String),

    /// The routine was resumed after it had already completed.
    #[error("Routine resumed after completion")]
    Exhausted,
}

impl CommandError {
    /// The failure category reported on the wire.
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::InvalidArguments(_) | Self::MissingArgument(_) => FailureKind::InvalidArguments,
            Self::Execution(_) | Self::Exhausted => FailureKind::Execution,
        }
    }

    /// Convert into the wire failure description.
    #[must_use]
    pub fn to_failure(&self) -> FailureInfo {
        FailureInfo::new(self.failure_kind(), self.to_string())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidArguments(e.to_string())
    }
}

/// Errors constructing the dispatcher.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid executor configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(
            CommandError::InvalidArguments("x".into()).failure_kind(),
            FailureKind::InvalidArguments
        );
        assert_eq!(CommandError::MissingArgument(0).failure_kind(), FailureKind::InvalidArguments);
        assert_eq!(CommandError::Execution("x".into()).failure_kind(), FailureKind::Execution);
        assert_eq!(CommandError::Exhausted.failure_kind(), FailureKind::Execution);
    }

    #[test]
    fn test_to_failure_keeps_message() {
        let failure = CommandError::Execution("disk on fire".into()).to_failure();
        assert_eq!(failure.kind, FailureKind::Execution);
        assert_eq!(failure.message, "Execution failed: disk on fire");
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<u64>("\"nope\"").unwrap_err();
        assert!(matches!(CommandError::from(err), CommandError::InvalidArguments(_)));
    }
}
