//! Checksum routines. Which one applies, and with which parameters, comes from the schema.

use crate::can::{Identifier, CAN_MAX_DLEN};
use crate::schema::{ChecksumAlgorithm, ChecksumSpec, CompiledMessage};

/// Compute a checksum over `data`. The checksum field itself must already be cleared.
pub(crate) fn compute(spec: &ChecksumSpec, id: Identifier, data: &[u8], mask: u64) -> u64 {
    let (address, address_len) = id.checksum_bytes();
    let address: &[u8] = if spec.include_address {
        &address[4 - address_len..]
    } else {
        &[]
    };
    let length = [data.len() as u8];
    let length: &[u8] = if spec.include_length { &length } else { &[] };

    let bytes = address.iter().chain(data).chain(length).copied();

    let value = match spec.algorithm {
        ChecksumAlgorithm::Xor => bytes.fold(spec.init, |acc, b| acc ^ b as u64),
        ChecksumAlgorithm::Sum => bytes.fold(spec.init, |acc, b| acc.wrapping_add(b as u64)),
        ChecksumAlgorithm::NibbleSum => bytes.fold(spec.init, |acc, b| {
            acc.wrapping_add((b >> 4) as u64).wrapping_add((b & 0xf) as u64)
        }),
        ChecksumAlgorithm::Crc8 { poly } => {
            let crc = bytes.fold(spec.init as u8, |mut crc, b| {
                crc ^= b;
                for _ in 0..8 {
                    crc = if crc & 0x80 != 0 {
                        (crc << 1) ^ poly
                    } else {
                        crc << 1
                    };
                }
                crc
            });
            crc as u64
        }
    };

    let value = if spec.negate {
        value.wrapping_neg()
    } else {
        value
    };

    (value ^ spec.xor_out) & mask
}

/// Checksum of a message payload, computed with the checksum field zeroed.
fn expected(message: &CompiledMessage, spec: &ChecksumSpec, idx: usize, data: &[u8]) -> u64 {
    let layout = &message.layouts[idx];

    let mut buf = [0u8; CAN_MAX_DLEN];
    let buf = &mut buf[..data.len()];
    buf.copy_from_slice(data);
    layout.pack(buf, 0);

    compute(spec, message.definition.id, buf, layout.value_mask())
}

/// Whether the checksum field matches the payload. Messages without a checksum always pass.
pub(crate) fn verify(message: &CompiledMessage, data: &[u8]) -> bool {
    match (&message.definition.checksum, message.checksum) {
        (Some(spec), Some(idx)) => {
            message.layouts[idx].extract(data) == expected(message, spec, idx, data)
        }
        _ => true,
    }
}

/// Write the checksum field. Must run after every other byte is final.
pub(crate) fn write(message: &CompiledMessage, data: &mut [u8]) {
    if let (Some(spec), Some(idx)) = (&message.definition.checksum, message.checksum) {
        let checksum = expected(message, spec, idx, data);
        message.layouts[idx].pack(data, checksum);
    }
}
