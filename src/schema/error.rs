//! Error types for schema construction and lookup.

use thiserror::Error;

use crate::can::Identifier;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Message {0} Not Found")]
    NotFound(Identifier),
    #[error("Invalid Identifier {0}")]
    InvalidIdentifier(Identifier),
    #[error("Message {id}: invalid payload length {length}")]
    InvalidLength { id: Identifier, length: usize },
    #[error("Duplicate Message {0}")]
    DuplicateMessage(Identifier),
    #[error("Message {id}: duplicate signal {signal}")]
    DuplicateSignal { id: Identifier, signal: String },
    #[error("Message {id}: signal {signal} has invalid bit length {bit_length}")]
    InvalidBitLength {
        id: Identifier,
        signal: String,
        bit_length: u32,
    },
    #[error("Message {id}: signal {signal} exceeds the payload")]
    SignalOutOfBounds { id: Identifier, signal: String },
    #[error("Message {id}: signal {signal} has an invalid scale or offset")]
    InvalidScale { id: Identifier, signal: String },
    #[error("Message {id}: range [{min}, {max}] of signal {signal} is not representable")]
    RangeNotRepresentable {
        id: Identifier,
        signal: String,
        min: f64,
        max: f64,
    },
    #[error("Message {id}: signals {first} and {second} overlap")]
    OverlappingSignals {
        id: Identifier,
        first: String,
        second: String,
    },
    #[error("Message {id}: checksum or counter refers to unknown signal {signal}")]
    UnknownIntegritySignal { id: Identifier, signal: String },
    #[error("Message {id}: counter signal {signal} must be unsigned")]
    SignedCounter { id: Identifier, signal: String },
    #[error("Binding refers to unknown signal {signal} of message {id}")]
    UnknownBinding { id: Identifier, signal: String },
    #[error("State field {0} is bound more than once")]
    DuplicateBinding(String),
}
