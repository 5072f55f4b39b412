use std::collections::HashMap;
use std::time::Duration;

use crate::can::{Frame, Identifier};
use crate::codec::checksum;
use crate::codec::error::EncodeError;
use crate::schema::{MessageSchema, SignalDefinition};

/// Packs physical signal values into frames. Owns one rolling counter sequence per message, so each outbound stream should use a single encoder.
#[derive(Debug)]
pub struct FrameEncoder<'a> {
    schema: &'a MessageSchema,
    counters: HashMap<Identifier, u64>,
}

impl<'a> FrameEncoder<'a> {
    pub fn new(schema: &'a MessageSchema) -> Self {
        Self {
            schema,
            counters: HashMap::new(),
        }
    }

    /// Encode a frame from `(signal, physical value)` pairs. Signals that are not given use their declared default. Values outside the representable range are clamped. The counter and checksum fields are always computed by the encoder.
    ///
    /// The frame is returned on bus 0 with a zero timestamp.
    pub fn encode(&mut self, id: Identifier, values: &[(&str, f64)]) -> Result<Frame, EncodeError> {
        let message = self
            .schema
            .compiled(id)
            .ok_or(EncodeError::UnknownMessage(id))?;
        let definition = &message.definition;

        if let Some((name, _)) = values
            .iter()
            .find(|(name, _)| definition.signal_index(name).is_none())
        {
            return Err(EncodeError::UnknownSignal {
                id,
                signal: name.to_string(),
            });
        }

        let mut data = vec![0u8; definition.length];

        let signals = definition.signals.iter().zip(message.layouts.iter());
        for (idx, (signal, layout)) in signals.enumerate() {
            if Some(idx) == message.checksum || Some(idx) == message.counter {
                continue;
            }

            let value = values
                .iter()
                .rev()
                .find(|(name, _)| *name == signal.name)
                .map(|(_, value)| *value)
                .unwrap_or(signal.default);

            layout.pack_raw(&mut data, to_raw(signal, value));
        }

        if let Some(idx) = message.counter {
            let layout = &message.layouts[idx];
            let counter = self.counters.entry(id).or_insert(0);
            layout.pack(&mut data, *counter);
            *counter = counter.wrapping_add(1) & layout.value_mask();
        }

        checksum::write(message, &mut data);

        Ok(Frame {
            bus: 0,
            id,
            data,
            loopback: false,
            timestamp: Duration::ZERO,
        })
    }

    /// Counter value the next frame of `id` will carry.
    pub fn next_counter(&self, id: Identifier) -> u64 {
        self.counters.get(&id).copied().unwrap_or(0)
    }

    /// Restart all rolling counters at zero.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

/// Physical to raw integer, rounded and clamped to what the bit width can hold. NaN encodes as raw zero.
fn to_raw(signal: &SignalDefinition, physical: f64) -> i128 {
    let (lo, hi) = signal.raw_bounds();
    let raw = ((physical - signal.offset) / signal.scale).round();
    if raw.is_nan() {
        return 0;
    }
    (raw as i128).clamp(lo, hi)
}
