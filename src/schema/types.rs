//! Types describing CAN messages and the signals packed into them.
use std::time::Duration;

use crate::can::Identifier;

/// Bit ordering of a signal inside the payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    /// Intel. `start_bit` is the least significant bit, bit `k` lives in byte `k / 8` at position `k % 8`.
    LittleEndian,
    /// Motorola, using linear MSB-first numbering. `start_bit` is the most significant bit, bit `k` lives in byte `k / 8` at position `7 - k % 8`.
    BigEndian,
}

/// A named physical quantity packed into a bit range of a message payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalDefinition {
    pub name: String,
    pub start_bit: u32,
    pub bit_length: u32,
    pub byte_order: ByteOrder,
    /// Two's complement when set
    pub signed: bool,
    pub scale: f64,
    pub offset: f64,
    /// Physical `(min, max)`. `None` means the full span of the raw integer.
    #[cfg_attr(feature = "serde", serde(default))]
    pub range: Option<(f64, f64)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub unit: String,
    /// Physical value written by the encoder when the caller leaves the signal out.
    #[cfg_attr(feature = "serde", serde(default))]
    pub default: f64,
}

impl SignalDefinition {
    /// Unsigned little endian signal with scale 1 and offset 0.
    pub fn new(name: &str, start_bit: u32, bit_length: u32) -> Self {
        Self {
            name: name.to_string(),
            start_bit,
            bit_length,
            byte_order: ByteOrder::LittleEndian,
            signed: false,
            scale: 1.0,
            offset: 0.0,
            range: None,
            unit: String::new(),
            default: 0.0,
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.byte_order = ByteOrder::BigEndian;
        self
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn scale(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn default_value(mut self, default: f64) -> Self {
        self.default = default;
        self
    }

    /// Smallest and largest raw integer the bit width can hold.
    pub fn raw_bounds(&self) -> (i128, i128) {
        let n = self.bit_length.clamp(1, 64);
        if self.signed {
            (-(1i128 << (n - 1)), (1i128 << (n - 1)) - 1)
        } else {
            (0, (1i128 << n) - 1)
        }
    }

    /// Physical `(min, max)`, either declared or derived from the raw span.
    pub fn physical_range(&self) -> (f64, f64) {
        match self.range {
            Some(range) => range,
            None => {
                let (lo, hi) = self.raw_bounds();
                let a = lo as f64 * self.scale + self.offset;
                let b = hi as f64 * self.scale + self.offset;
                (a.min(b), a.max(b))
            }
        }
    }
}

/// Checksum routine. The exact algorithm differs per vehicle family, so it is schema data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChecksumAlgorithm {
    /// Byte-wise XOR
    Xor,
    /// Byte-wise additive sum
    Sum,
    /// Sum of all 4-bit nibbles
    NibbleSum,
    /// CRC-8, MSB first, with the given polynomial
    Crc8 { poly: u8 },
}

/// Integrity field of a message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChecksumSpec {
    /// Signal holding the checksum
    pub signal: String,
    pub algorithm: ChecksumAlgorithm,
    /// Feed the identifier bytes in front of the payload
    #[cfg_attr(feature = "serde", serde(default))]
    pub include_address: bool,
    /// Feed the payload length after the payload
    #[cfg_attr(feature = "serde", serde(default))]
    pub include_length: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub init: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub xor_out: u64,
    /// Two's complement negation before `xor_out` is applied
    #[cfg_attr(feature = "serde", serde(default))]
    pub negate: bool,
}

impl ChecksumSpec {
    pub fn new(signal: &str, algorithm: ChecksumAlgorithm) -> Self {
        Self {
            signal: signal.to_string(),
            algorithm,
            include_address: false,
            include_length: false,
            init: 0,
            xor_out: 0,
            negate: false,
        }
    }
}

/// Static description of one CAN message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageDefinition {
    pub id: Identifier,
    pub name: String,
    /// Payload length in bytes
    pub length: usize,
    pub signals: Vec<SignalDefinition>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub checksum: Option<ChecksumSpec>,
    /// Name of the rolling counter signal
    #[cfg_attr(feature = "serde", serde(default))]
    pub counter: Option<String>,
    /// Expected transmission period. Zero disables staleness tracking for event driven messages.
    pub period: Duration,
}

impl MessageDefinition {
    pub fn new(id: Identifier, name: &str, length: usize, period: Duration) -> Self {
        Self {
            id,
            name: name.to_string(),
            length,
            signals: vec![],
            checksum: None,
            counter: None,
            period,
        }
    }

    pub fn signal(mut self, signal: SignalDefinition) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn checksum(mut self, checksum: ChecksumSpec) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn counter(mut self, signal: &str) -> Self {
        self.counter = Some(signal.to_string());
        self
    }

    /// Position of a signal in [`MessageDefinition::signals`].
    pub fn signal_index(&self, name: &str) -> Option<usize> {
        self.signals.iter().position(|s| s.name == name)
    }
}
