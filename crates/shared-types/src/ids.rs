//! Processing identifier for request correlation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation identifier for one logical request.
///
/// Chosen by the controller and unique among the requests that are currently
/// open on that controller. An id may be reused once its request has closed.
/// No ordering relationship is implied between different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingId(u64);

impl ProcessingId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProcessingId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<ProcessingId> for u64 {
    fn from(id: ProcessingId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_id_display() {
        assert_eq!(ProcessingId::new(42).to_string(), "42");
    }

    #[test]
    fn test_processing_id_serializes_as_integer() {
        let json = serde_json::to_string(&ProcessingId::new(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: ProcessingId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ProcessingId::from(7));
    }
}
