//! Precomputed bit layout of a signal, shared by decoding and encoding so both are inverses by construction.

use crate::schema::types::{ByteOrder, SignalDefinition};

/// One contiguous run of bits within a single payload byte.
///
/// Take `num_bits` bits starting at `bit_offset` in `data[byte_index]` and place them at `value_shift` in the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BitSpan {
    pub byte_index: usize,
    /// Lowest bit position within the byte (0..=7)
    pub bit_offset: u8,
    /// 1..=8
    pub num_bits: u8,
    pub value_shift: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignalLayout {
    pub spans: Vec<BitSpan>,
    pub bit_length: u32,
    pub signed: bool,
}

impl SignalLayout {
    /// Build the spans for a signal. The caller has already checked `start_bit + bit_length` against the payload width.
    pub fn new(signal: &SignalDefinition) -> Self {
        let mut spans = Vec::new();
        let mut byte_index = (signal.start_bit / 8) as usize;
        let mut remaining = signal.bit_length;

        match signal.byte_order {
            ByteOrder::BigEndian => {
                // Walk from the MSB down within each byte, continue at bit 7 of the next byte
                let mut high = 7 - (signal.start_bit % 8) as u8;
                while remaining > 0 {
                    let num_bits = std::cmp::min(high as u32 + 1, remaining) as u8;
                    remaining -= num_bits as u32;
                    spans.push(BitSpan {
                        byte_index,
                        bit_offset: high + 1 - num_bits,
                        num_bits,
                        value_shift: remaining as u8,
                    });
                    byte_index += 1;
                    high = 7;
                }
            }
            ByteOrder::LittleEndian => {
                let mut bit_index = (signal.start_bit % 8) as u8;
                let mut value_shift: u32 = 0;
                while remaining > 0 {
                    let num_bits = std::cmp::min(8 - bit_index as u32, remaining) as u8;
                    spans.push(BitSpan {
                        byte_index,
                        bit_offset: bit_index,
                        num_bits,
                        value_shift: value_shift as u8,
                    });
                    value_shift += num_bits as u32;
                    remaining -= num_bits as u32;
                    byte_index += 1;
                    bit_index = 0;
                }
            }
        }

        Self {
            spans,
            bit_length: signal.bit_length,
            signed: signal.signed,
        }
    }

    /// Raw unsigned bits of the signal.
    pub fn extract(&self, data: &[u8]) -> u64 {
        let mut result: u64 = 0;
        for span in &self.spans {
            let mask = ((1u16 << span.num_bits) - 1) as u8;
            let bits = (data[span.byte_index] >> span.bit_offset) & mask;
            result |= (bits as u64) << span.value_shift;
        }
        result
    }

    /// Raw integer, sign extended for signed signals.
    pub fn extract_raw(&self, data: &[u8]) -> i128 {
        let bits = self.extract(data);
        if self.signed {
            let shift = 64 - self.bit_length;
            (((bits << shift) as i64) >> shift) as i128
        } else {
            bits as i128
        }
    }

    /// Write raw bits, clearing the target bits first so signals can share bytes.
    pub fn pack(&self, data: &mut [u8], raw: u64) {
        for span in &self.spans {
            let mask = ((1u16 << span.num_bits) - 1) as u8;
            let bits = ((raw >> span.value_shift) as u8) & mask;
            data[span.byte_index] &= !(mask << span.bit_offset);
            data[span.byte_index] |= bits << span.bit_offset;
        }
    }

    /// Write a raw integer. Negative values are stored as two's complement of the signal width.
    pub fn pack_raw(&self, data: &mut [u8], raw: i128) {
        self.pack(data, raw as u64);
    }

    /// Payload bits occupied by this signal, bit `byte * 8 + position`.
    pub fn occupancy(&self) -> u64 {
        self.spans.iter().fold(0u64, |acc, span| {
            let mask = ((1u16 << span.num_bits) - 1) as u64;
            acc | (mask << (span.byte_index * 8 + span.bit_offset as usize))
        })
    }

    /// Mask covering the raw value of the signal.
    pub fn value_mask(&self) -> u64 {
        if self.bit_length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bit_length) - 1
        }
    }
}
