//! # Error Types
//!
//! Errors raised while encoding envelopes or moving buffers across the channel.

use thiserror::Error;

/// Errors from the wire codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Frame version not supported.
    #[error("Unsupported version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u16, supported: u16 },

    /// Serialization failed.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Bytes could not be decoded into a frame.
    #[error("Malformed frame: {0}")]
    Malformed(String),
}

/// Ownership-transfer defects.
///
/// These never describe a normal runtime condition. A retained buffer means
/// the sending code copied instead of moving, which is an implementation bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// A sender-side buffer handle still holds data after the send.
    #[error("Buffer {index} retained after send: len={len}, capacity={capacity}")]
    BufferRetained {
        index: usize,
        len: usize,
        capacity: usize,
    },
}
