//! # Envelopes
//!
//! The two envelope shapes exchanged over the channel and the three-state
//! completion marker.
//!
//! ## Flow
//!
//! ```text
//! Controller ──ControlMessage::Request──→ Executor
//!            ←─ResponseEnvelope(Continuing)──
//!            ←─ResponseEnvelope(Continuing)──
//!            ←─ResponseEnvelope(Final | Failed)──
//! ```
//!
//! For one processing id the executor emits zero or more `Continuing`
//! responses followed by exactly one `Final` or `Failed` response. Nothing is
//! emitted after the terminal response.

use crate::buffer::TransferBuffer;
use crate::ids::ProcessingId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Completion marker carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    /// An intermediate result; more responses follow.
    Continuing,
    /// The final value; no responses follow.
    Final,
    /// The request failed; the payload holds a [`FailureInfo`].
    Failed,
}

impl Completion {
    /// Whether no further responses follow this one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continuing)
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuing => write!(f, "continuing"),
            Self::Final => write!(f, "final"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Whether the caller wants to observe results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// Emit one response per step plus the terminal response.
    #[default]
    Stream,
    /// Fire-and-forget: drive the command to completion but send nothing back.
    Discard,
}

/// A request from the controller to run a named command.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation id chosen by the controller.
    pub processing_id: ProcessingId,
    /// Name the command routine is registered under.
    pub command: String,
    /// Ordered, command-specific arguments.
    pub arguments: Vec<Value>,
    /// Buffers whose ownership moves to the executor.
    #[serde(default)]
    pub buffers: Vec<TransferBuffer>,
    /// Whether responses are wanted.
    #[serde(default)]
    pub reply: ReplyMode,
}

impl RequestEnvelope {
    /// Create a streaming request with no buffers.
    pub fn new(processing_id: ProcessingId, command: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            processing_id,
            command: command.into(),
            arguments,
            buffers: Vec::new(),
            reply: ReplyMode::Stream,
        }
    }

    /// Move `buffers` into the envelope.
    #[must_use]
    pub fn with_buffers(mut self, buffers: Vec<TransferBuffer>) -> Self {
        self.buffers = buffers;
        self
    }

    /// Set the reply mode.
    #[must_use]
    pub fn with_reply(mut self, reply: ReplyMode) -> Self {
        self.reply = reply;
        self
    }

    /// Whether the sender wants responses.
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.reply == ReplyMode::Stream
    }
}

/// Messages travelling from controller to executor.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Start a command.
    Request(RequestEnvelope),
    /// Stop resuming a running command and terminate it with a
    /// [`FailureKind::Cancelled`] failure.
    Cancel { processing_id: ProcessingId },
    /// A request that named this processing id but could not be decoded.
    /// Produced by byte transports on receipt; never encoded.
    #[serde(skip)]
    Malformed {
        processing_id: ProcessingId,
        reason: String,
    },
}

impl ControlMessage {
    /// The processing id this message refers to.
    #[must_use]
    pub fn processing_id(&self) -> ProcessingId {
        match self {
            Self::Request(request) => request.processing_id,
            Self::Cancel { processing_id } | Self::Malformed { processing_id, .. } => *processing_id,
        }
    }
}

impl From<RequestEnvelope> for ControlMessage {
    fn from(request: RequestEnvelope) -> Self {
        Self::Request(request)
    }
}

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No routine is registered under the requested name.
    UnknownCommand,
    /// The routine rejected its arguments or buffers.
    InvalidArguments,
    /// The routine returned an error while resuming.
    Execution,
    /// The routine panicked while resuming.
    Panicked,
    /// The controller cancelled the request.
    Cancelled,
    /// An envelope or its failure payload could not be interpreted.
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownCommand => "unknown command",
            Self::InvalidArguments => "invalid arguments",
            Self::Execution => "execution error",
            Self::Panicked => "panicked",
            Self::Cancelled => "cancelled",
            Self::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

/// Description of a failure, carried as the payload of a `Failed` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureInfo {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure for a command name with no registered routine.
    pub fn unknown_command(command: &str) -> Self {
        Self::new(FailureKind::UnknownCommand, format!("unknown command: {command}"))
    }
}

impl fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A response from the executor for one step of a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Echoes the request's processing id.
    pub processing_id: ProcessingId,
    pub completion: Completion,
    /// The step value, or a serialized [`FailureInfo`] when `Failed`.
    pub payload: Value,
    /// Buffers whose ownership moves back to the controller.
    #[serde(default)]
    pub buffers: Vec<TransferBuffer>,
}

impl ResponseEnvelope {
    /// An intermediate result.
    pub fn continuing(processing_id: ProcessingId, payload: Value, buffers: Vec<TransferBuffer>) -> Self {
        Self {
            processing_id,
            completion: Completion::Continuing,
            payload,
            buffers,
        }
    }

    /// The final value.
    pub fn complete(processing_id: ProcessingId, payload: Value, buffers: Vec<TransferBuffer>) -> Self {
        Self {
            processing_id,
            completion: Completion::Final,
            payload,
            buffers,
        }
    }

    /// A terminal failure.
    pub fn failed(processing_id: ProcessingId, failure: &FailureInfo) -> Self {
        let payload = serde_json::to_value(failure)
            .unwrap_or_else(|_| Value::String(failure.to_string()));
        Self {
            processing_id,
            completion: Completion::Failed,
            payload,
            buffers: Vec::new(),
        }
    }

    /// Interpret the payload of a `Failed` response.
    ///
    /// Returns `None` for non-failed responses. A payload that is not a
    /// [`FailureInfo`] is reported as [`FailureKind::Malformed`] so the caller
    /// still receives a failure.
    #[must_use]
    pub fn failure(&self) -> Option<FailureInfo> {
        if self.completion != Completion::Failed {
            return None;
        }
        Some(
            serde_json::from_value(self.payload.clone()).unwrap_or_else(|_| {
                let message = match &self.payload {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                FailureInfo::new(FailureKind::Malformed, message)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_terminal() {
        assert!(!Completion::Continuing.is_terminal());
        assert!(Completion::Final.is_terminal());
        assert!(Completion::Failed.is_terminal());
    }

    #[test]
    fn test_completion_wire_names() {
        assert_eq!(serde_json::to_string(&Completion::Continuing).unwrap(), "\"continuing\"");
        assert_eq!(serde_json::to_string(&Completion::Final).unwrap(), "\"final\"");
        assert_eq!(serde_json::to_string(&Completion::Failed).unwrap(), "\"failed\"");
    }

    #[test]
    fn test_request_defaults_to_stream() {
        let request = RequestEnvelope::new(ProcessingId::new(1), "count_up", vec![json!(3)]);
        assert!(request.expects_reply());
        assert!(request.buffers.is_empty());

        let request = request.with_reply(ReplyMode::Discard);
        assert!(!request.expects_reply());
    }

    #[test]
    fn test_request_missing_optional_fields() {
        let request: RequestEnvelope = serde_json::from_value(json!({
            "processing_id": 5,
            "command": "echo",
            "arguments": ["hi"],
        }))
        .unwrap();

        assert_eq!(request.processing_id, ProcessingId::new(5));
        assert_eq!(request.reply, ReplyMode::Stream);
        assert!(request.buffers.is_empty());
    }

    #[test]
    fn test_failed_response_carries_failure_info() {
        let failure = FailureInfo::unknown_command("nope");
        let response = ResponseEnvelope::failed(ProcessingId::new(3), &failure);

        assert_eq!(response.completion, Completion::Failed);
        assert_eq!(response.failure(), Some(failure));
    }

    #[test]
    fn test_failure_on_non_failed_response_is_none() {
        let response = ResponseEnvelope::complete(ProcessingId::new(3), json!(4), Vec::new());
        assert!(response.failure().is_none());
    }

    #[test]
    fn test_malformed_failure_payload() {
        let response = ResponseEnvelope {
            processing_id: ProcessingId::new(9),
            completion: Completion::Failed,
            payload: json!("boom"),
            buffers: Vec::new(),
        };

        let failure = response.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Malformed);
        assert_eq!(failure.message, "boom");
    }

    #[test]
    fn test_control_message_processing_id() {
        let request = RequestEnvelope::new(ProcessingId::new(11), "echo", Vec::new());
        assert_eq!(ControlMessage::from(request).processing_id(), ProcessingId::new(11));

        let cancel = ControlMessage::Cancel {
            processing_id: ProcessingId::new(12),
        };
        assert_eq!(cancel.processing_id(), ProcessingId::new(12));
    }
}
