//! Schema-driven CAN signal codec.
//!
//! [`FrameDecoder`] turns raw frames into physical values and checks integrity fields, [`FrameEncoder`] does the reverse and fills in rolling counters and checksums.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use vehicle_interface::codec::{FrameDecoder, FrameEncoder};
//! use vehicle_interface::schema::{MessageDefinition, MessageSchema, SignalDefinition};
//!
//! let message = MessageDefinition::new(0x1e2.into(), "STEERING", 8, Duration::from_millis(10))
//!     .signal(SignalDefinition::new("ANGLE", 24, 16).big_endian().signed().scale(0.1, 0.0));
//! let schema = MessageSchema::new(1, vec![message]).unwrap();
//!
//! let mut encoder = FrameEncoder::new(&schema);
//! let mut decoder = FrameDecoder::new(&schema);
//!
//! let frame = encoder.encode(0x1e2.into(), &[("ANGLE", -12.3)]).unwrap();
//! let decoded = decoder.decode(&frame).unwrap();
//! assert!((decoded.value("ANGLE").unwrap() + 12.3).abs() < 0.1);
//! ```

pub(crate) mod checksum;
mod decoder;
mod encoder;
pub mod error;

pub use decoder::{DecodedSignal, DecodedSignalSet, FrameDecoder};
pub use encoder::FrameEncoder;
pub use error::{DecodeError, EncodeError};
