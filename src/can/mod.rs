//! Generic CAN types and traits

pub mod async_can;

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

pub use async_can::AsyncCanAdapter;

/// Maximum payload length of a classic CAN frame.
pub const CAN_MAX_DLEN: usize = 8;

const STANDARD_ID_MAX: u32 = 0x7ff;
const EXTENDED_ID_MAX: u32 = 0x1fffffff;

/// Identifier for a CAN frame
#[derive(Copy, Clone, PartialOrd, Ord, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Identifier {
    Standard(u32),
    Extended(u32),
}

impl Identifier {
    pub fn is_standard(&self) -> bool {
        match self {
            Identifier::Standard(_) => true,
            Identifier::Extended(_) => false,
        }
    }
    pub fn is_extended(&self) -> bool {
        !self.is_standard()
    }

    /// Whether the raw value fits the 11-bit or 29-bit range of the variant.
    pub fn is_valid(&self) -> bool {
        match *self {
            Identifier::Standard(id) => id <= STANDARD_ID_MAX,
            Identifier::Extended(id) => id <= EXTENDED_ID_MAX,
        }
    }

    /// Big endian identifier bytes as fed into address-covering checksums. Two bytes for standard, four for extended identifiers.
    pub fn checksum_bytes(&self) -> ([u8; 4], usize) {
        match *self {
            Identifier::Standard(id) => (id.to_be_bytes(), 2),
            Identifier::Extended(id) => (id.to_be_bytes(), 4),
        }
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Extended(id) => write!(f, "0x{:08x}", id),
            Identifier::Standard(id) => write!(f, "0x{:03x}", id),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Identifier {
        if id <= STANDARD_ID_MAX {
            Identifier::Standard(id)
        } else {
            Identifier::Extended(id)
        }
    }
}

impl From<Identifier> for u32 {
    fn from(val: Identifier) -> u32 {
        match val {
            Identifier::Standard(id) => id,
            Identifier::Extended(id) => id,
        }
    }
}

/// A CAN frame
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// The bus index for adapters supporting multiple CAN busses
    pub bus: u8,
    /// Arbitration ID
    pub id: Identifier,
    /// Frame Data
    pub data: Vec<u8>,
    /// Wheter the frame was sent out by the adapter
    pub loopback: bool,
    /// Arrival time relative to the start of the session
    pub timestamp: Duration,
}
impl Unpin for Frame {}

impl Frame {
    pub fn new(bus: u8, id: Identifier, data: &[u8]) -> Result<Frame, crate::error::Error> {
        if data.len() > CAN_MAX_DLEN {
            return Err(crate::error::Error::MalformedFrame);
        }

        if !id.is_valid() {
            return Err(crate::error::Error::MalformedFrame);
        }

        Ok(Frame {
            bus,
            id,
            data: data.to_vec(),
            loopback: false,
            timestamp: Duration::ZERO,
        })
    }

    /// Sets the arrival timestamp.
    pub fn with_timestamp(mut self, timestamp: Duration) -> Frame {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("bus", &self.bus)
            .field("id", &self.id)
            .field("data", &hex::encode(&self.data))
            .field("loopback", &self.loopback)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Trait for a Blocking CAN Adapter. This is the seam to the bus transport: anything able to move frames can drive the vehicle interface.
pub trait CanAdapter {
    /// Send as many frames from the front of the queue as the transport accepts. Frames that could not be sent stay in the queue.
    fn send(&mut self, frames: &mut VecDeque<Frame>) -> crate::Result<()>;
    /// Receive all frames that arrived since the last call, without blocking.
    fn recv(&mut self) -> crate::Result<Vec<Frame>>;
}
