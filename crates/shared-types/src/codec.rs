//! # Wire Codec
//!
//! Encodes envelopes into versioned JSON frames for transports that carry
//! bytes rather than values. The in-process channel moves envelopes directly
//! and never touches this codec.

use crate::envelope::{ControlMessage, FailureInfo, FailureKind, ResponseEnvelope};
use crate::errors::CodecError;
use crate::ids::ProcessingId;
use crate::PROTOCOL_VERSION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A versioned frame around one message.
#[derive(Debug, Serialize, Deserialize)]
pub struct Frame<T> {
    /// Protocol version. Checked before the message is decoded.
    pub version: u16,
    pub message: T,
}

/// JSON frame codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Encode `message` into a frame tagged with the current protocol version.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if the message cannot be serialized.
    pub fn encode<T: Serialize>(&self, message: &T) -> Result<Vec<u8>, CodecError> {
        let frame = Frame {
            version: PROTOCOL_VERSION,
            message,
        };
        serde_json::to_vec(&frame).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode a frame produced by [`JsonCodec::encode`].
    ///
    /// # Errors
    ///
    /// - [`CodecError::Malformed`] if the bytes are not a frame of `T`
    /// - [`CodecError::UnsupportedVersion`] if the frame version differs
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        self.decode_message(&self.decode_frame(bytes)?)
    }

    /// Parse the frame around a message without interpreting the message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] if the bytes are not a JSON frame.
    pub fn decode_frame(&self, bytes: &[u8]) -> Result<Frame<Value>, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    /// Check the frame version and decode its message.
    ///
    /// # Errors
    ///
    /// - [`CodecError::UnsupportedVersion`] if the frame version differs
    /// - [`CodecError::Malformed`] if the message is not a `T`
    pub fn decode_message<T: DeserializeOwned>(&self, frame: &Frame<Value>) -> Result<T, CodecError> {
        if frame.version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion {
                received: frame.version,
                supported: PROTOCOL_VERSION,
            });
        }

        T::deserialize(&frame.message).map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

/// Envelopes that can stand in for a message which names its processing id
/// but does not decode.
///
/// Byte transports use this so the request behind a corrupt message still
/// terminates with a [`FailureKind::Malformed`] failure instead of waiting
/// forever.
pub trait MalformedEnvelope: Sized {
    /// Build the replacement envelope, or `None` if `message` carries no
    /// usable processing id.
    fn from_malformed(message: &Value, reason: &str) -> Option<Self>;
}

/// The `processing_id` field of an undecoded message, if it is readable.
#[must_use]
pub fn message_processing_id(message: &Value) -> Option<ProcessingId> {
    message
        .get("processing_id")
        .and_then(Value::as_u64)
        .map(ProcessingId::new)
}

impl MalformedEnvelope for ControlMessage {
    /// Only requests are recovered; a corrupt cancel is dropped so it cannot
    /// terminate a command that is still running.
    fn from_malformed(message: &Value, reason: &str) -> Option<Self> {
        if message.get("type").and_then(Value::as_str) != Some("request") {
            return None;
        }
        message_processing_id(message).map(|processing_id| Self::Malformed {
            processing_id,
            reason: reason.to_string(),
        })
    }
}

impl MalformedEnvelope for ResponseEnvelope {
    fn from_malformed(message: &Value, reason: &str) -> Option<Self> {
        message_processing_id(message).map(|processing_id| {
            Self::failed(
                processing_id,
                &FailureInfo::new(FailureKind::Malformed, format!("malformed response: {reason}")),
            )
        })
    }
}
