//! Contains the main error type for the library.
use thiserror::Error;

/// The main error type for the library. Each module has it's own error type that is contained by this error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed Frame")]
    MalformedFrame,
    #[error("Timeout")]
    Timeout,
    #[error("Transmit queue full")]
    TxQueueFull,
    #[error("Adapter disconnected")]
    Disconnected,
    #[error(transparent)]
    SchemaError(#[from] crate::schema::SchemaError),
    #[error(transparent)]
    DecodeError(#[from] crate::codec::DecodeError),
    #[error(transparent)]
    EncodeError(#[from] crate::codec::EncodeError),
    #[error(transparent)]
    LimiterFault(#[from] crate::limiter::LimiterFault),
}

impl From<tokio_stream::Elapsed> for Error {
    fn from(_: tokio_stream::Elapsed) -> Error {
        Error::Timeout
    }
}
