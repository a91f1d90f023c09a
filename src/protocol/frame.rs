//! Frame struct with typed accessors.
//!
//! One decoded unit of the wire protocol: the command token from the
//! header plus the raw payload bytes (without the trailing newline).
//! Uses `bytes::Bytes` for zero-copy payload sharing.

use bytes::Bytes;

use super::wire_format::Tag;

/// A complete inbound protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Command token exactly as it appeared on the wire.
    pub command: String,
    /// Payload bytes, binary-safe up to the declared length.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from a command token and payload.
    pub fn new(command: impl Into<String>, payload: Bytes) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// The recognized tag, if the command token is one.
    #[inline]
    pub fn tag(&self) -> Option<Tag> {
        Tag::from_token(&self.command)
    }
}
