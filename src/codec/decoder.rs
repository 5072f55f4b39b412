use std::collections::HashMap;
use std::time::Duration;

use crate::can::{Frame, Identifier};
use crate::codec::checksum;
use crate::codec::error::DecodeError;
use crate::schema::{MessageSchema, SignalDefinition};

use tracing::debug;

/// A single decoded signal. The name borrows from the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal<'a> {
    pub name: &'a str,
    /// Physical value, `raw * scale + offset`
    pub value: f64,
    /// Outside the declared physical range. The value is kept anyway.
    pub out_of_range: bool,
}

/// All signals of one frame together with the integrity verdict for that frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignalSet<'a> {
    pub id: Identifier,
    pub timestamp: Duration,
    pub checksum_valid: bool,
    pub counter_valid: bool,
    /// In schema declaration order
    pub signals: Vec<DecodedSignal<'a>>,
}

impl<'a> DecodedSignalSet<'a> {
    /// Both checksum and rolling counter passed (or the message declares neither).
    pub fn is_valid(&self) -> bool {
        self.checksum_valid && self.counter_valid
    }

    pub fn get(&self, name: &str) -> Option<&DecodedSignal<'a>> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(|s| s.value)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct CounterTracker {
    last: Option<u64>,
    misses: u64,
}

/// Turns raw frames into physical signal values. Keeps the last rolling counter per message, so one decoder should see the whole stream of a bus.
#[derive(Debug)]
pub struct FrameDecoder<'a> {
    schema: &'a MessageSchema,
    counters: HashMap<Identifier, CounterTracker>,
}

impl<'a> FrameDecoder<'a> {
    pub fn new(schema: &'a MessageSchema) -> Self {
        Self {
            schema,
            counters: HashMap::new(),
        }
    }

    pub fn decode(&mut self, frame: &Frame) -> Result<DecodedSignalSet<'a>, DecodeError> {
        let schema = self.schema;
        let message = schema
            .compiled(frame.id)
            .ok_or(DecodeError::UnknownMessage(frame.id))?;
        let definition = &message.definition;

        if frame.data.len() != definition.length {
            return Err(DecodeError::LengthMismatch {
                id: frame.id,
                expected: definition.length,
                actual: frame.data.len(),
            });
        }

        let signals = definition
            .signals
            .iter()
            .zip(message.layouts.iter())
            .map(|(signal, layout)| {
                let value = layout.extract_raw(&frame.data) as f64 * signal.scale + signal.offset;
                DecodedSignal {
                    name: signal.name.as_str(),
                    value,
                    out_of_range: !in_range(signal, value),
                }
            })
            .collect();

        let checksum_valid = checksum::verify(message, &frame.data);
        if !checksum_valid {
            debug!("{} {}: checksum mismatch", definition.name, frame.id);
        }

        let counter_valid = match message.counter {
            Some(idx) => {
                let layout = &message.layouts[idx];
                let value = layout.extract(&frame.data);
                self.check_counter(frame.id, value, layout.value_mask())
            }
            None => true,
        };

        Ok(DecodedSignalSet {
            id: frame.id,
            timestamp: frame.timestamp,
            checksum_valid,
            counter_valid,
            signals,
        })
    }

    /// Accept the next value or a single skipped value. Repeats, jumps backwards and larger gaps invalidate the frame. The observed value always becomes the new reference.
    fn check_counter(&mut self, id: Identifier, value: u64, mask: u64) -> bool {
        let tracker = self.counters.entry(id).or_default();

        let valid = match tracker.last {
            None => true,
            Some(last) => match value.wrapping_sub(last) & mask {
                1 => true,
                2 => {
                    tracker.misses += 1;
                    debug!("{}: single frame dropped, counter {} -> {}", id, last, value);
                    true
                }
                _ => {
                    tracker.misses += 1;
                    debug!("{}: counter invalid {} -> {}", id, last, value);
                    false
                }
            },
        };

        tracker.last = Some(value);
        valid
    }

    /// Counter gaps and repeats observed for a message.
    pub fn counter_misses(&self, id: Identifier) -> u64 {
        self.counters.get(&id).map(|t| t.misses).unwrap_or(0)
    }

    /// Forget all rolling counter history, e.g. when a new session starts.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

fn in_range(signal: &SignalDefinition, value: f64) -> bool {
    let (min, max) = signal.physical_range();
    let tolerance = signal.scale.abs() * 1e-6;
    value >= min - tolerance && value <= max + tolerance
}
