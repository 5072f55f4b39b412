//! Error types for the frame decoder and encoder.

use thiserror::Error;

use crate::can::Identifier;

/// Errors returned by [`crate::codec::FrameDecoder::decode`]. Integrity failures are not errors, they are reported as flags on the decoded set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Not part of the schema. Busses carry plenty of these, callers usually ignore them.
    #[error("Unknown Message {0}")]
    UnknownMessage(Identifier),
    #[error("Message {id}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        id: Identifier,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Unknown Message {0}")]
    UnknownMessage(Identifier),
    #[error("Message {id} has no signal {signal}")]
    UnknownSignal { id: Identifier, signal: String },
}
