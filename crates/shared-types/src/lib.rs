//! # Shared Types Crate
//!
//! This crate contains the envelope protocol spoken between a controller and
//! an executor.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every type that crosses the channel is defined here.
//! - **Correlation by id**: Each logical request is identified by a
//!   controller-chosen [`ProcessingId`]; every response echoes it.
//! - **One terminal per request**: Zero or more `Continuing` responses are
//!   followed by exactly one `Final` or `Failed` response.
//! - **Moved, never copied**: Binary payloads travel as [`TransferBuffer`]s
//!   whose ownership moves into the envelope.

pub mod buffer;
pub mod codec;
pub mod envelope;
pub mod errors;
pub mod ids;

pub use buffer::{detach_all, verify_transferred, TransferBuffer};
pub use codec::{message_processing_id, Frame, JsonCodec, MalformedEnvelope};
pub use envelope::{
    Completion, ControlMessage, FailureInfo, FailureKind, ReplyMode, RequestEnvelope,
    ResponseEnvelope,
};
pub use errors::{CodecError, TransferError};
pub use ids::ProcessingId;

/// Payload values carried by envelopes.
pub use serde_json::Value;

/// Current protocol version for encoded frames.
pub const PROTOCOL_VERSION: u16 = 1;
