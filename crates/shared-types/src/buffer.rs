//! # Ownership-Transferable Buffers
//!
//! Large binary payloads cross the channel by move. A [`TransferBuffer`] is
//! deliberately not `Clone`: the only ways to get its bytes into an envelope
//! are moving the value itself or [`TransferBuffer::detach`]ing it from a
//! handle the sender keeps, which leaves that handle empty.
//!
//! [`verify_transferred`] checks the sender-side handles after a send. A
//! non-empty handle is reported as [`TransferError::BufferRetained`].

use crate::errors::TransferError;
use serde::{Deserialize, Serialize};

/// A binary payload whose ownership moves across the channel.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferBuffer {
    bytes: Vec<u8>,
}

impl TransferBuffer {
    /// Take ownership of `bytes`. No copy is made.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Move the contents out, leaving this handle with zero length and capacity.
    #[must_use]
    pub fn detach(&mut self) -> TransferBuffer {
        TransferBuffer {
            bytes: std::mem::take(&mut self.bytes),
        }
    }

    /// Whether this handle has given up its allocation.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.bytes.is_empty() && self.bytes.capacity() == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Unwrap into the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for TransferBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for TransferBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Detach every handle in `handles`, returning the moved buffers in order.
pub fn detach_all(handles: &mut [TransferBuffer]) -> Vec<TransferBuffer> {
    handles.iter_mut().map(TransferBuffer::detach).collect()
}

/// Assert that every sender-side handle is empty after a send.
///
/// # Errors
///
/// Returns [`TransferError::BufferRetained`] for the first handle that still
/// reports a non-zero length or capacity.
pub fn verify_transferred<'a, I>(handles: I) -> Result<(), TransferError>
where
    I: IntoIterator<Item = &'a TransferBuffer>,
{
    for (index, handle) in handles.into_iter().enumerate() {
        if !handle.is_detached() {
            return Err(TransferError::BufferRetained {
                index,
                len: handle.len(),
                capacity: handle.capacity(),
            });
        }
    }
    Ok(())
}
