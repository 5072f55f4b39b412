//! Static catalog of CAN messages and their bit-packed signals.
//!
//! A [`MessageSchema`] is validated once when it is built and is read-only afterwards. Decoder, encoder and state aggregator all borrow the same schema.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use vehicle_interface::schema::{MessageDefinition, MessageSchema, SignalDefinition};
//!
//! let steering = MessageDefinition::new(482.into(), "STEERING", 8, Duration::from_millis(10))
//!     .signal(SignalDefinition::new("ANGLE", 24, 16).big_endian().signed().scale(0.1, 0.0).unit("deg"));
//!
//! let schema = MessageSchema::new(1, vec![steering]).unwrap();
//! assert_eq!(schema.signals_of(482.into()).unwrap().len(), 1);
//! ```

pub mod error;
pub(crate) mod layout;
pub mod types;

use std::collections::HashMap;

use crate::can::{Identifier, CAN_MAX_DLEN};
use layout::SignalLayout;

pub use error::SchemaError;
pub use types::*;

/// A message definition with its signal layouts resolved.
#[derive(Debug, Clone)]
pub(crate) struct CompiledMessage {
    pub definition: MessageDefinition,
    pub layouts: Vec<SignalLayout>,
    /// Index of the checksum signal
    pub checksum: Option<usize>,
    /// Index of the rolling counter signal
    pub counter: Option<usize>,
}

impl CompiledMessage {
    fn new(definition: MessageDefinition) -> Result<Self, SchemaError> {
        let id = definition.id;

        if !id.is_valid() {
            return Err(SchemaError::InvalidIdentifier(id));
        }
        if definition.length == 0 || definition.length > CAN_MAX_DLEN {
            return Err(SchemaError::InvalidLength {
                id,
                length: definition.length,
            });
        }

        let payload_bits = definition.length as u32 * 8;
        let mut layouts: Vec<SignalLayout> = Vec::with_capacity(definition.signals.len());

        for (idx, signal) in definition.signals.iter().enumerate() {
            if definition.signals[..idx].iter().any(|s| s.name == signal.name) {
                return Err(SchemaError::DuplicateSignal {
                    id,
                    signal: signal.name.clone(),
                });
            }

            if signal.bit_length == 0 || signal.bit_length > 64 {
                return Err(SchemaError::InvalidBitLength {
                    id,
                    signal: signal.name.clone(),
                    bit_length: signal.bit_length,
                });
            }

            let end = signal.start_bit.checked_add(signal.bit_length);
            if end.map_or(true, |end| end > payload_bits) {
                return Err(SchemaError::SignalOutOfBounds {
                    id,
                    signal: signal.name.clone(),
                });
            }

            check_scaling(id, signal)?;

            let layout = SignalLayout::new(signal);
            for (other, other_layout) in definition.signals.iter().zip(layouts.iter()) {
                if other_layout.occupancy() & layout.occupancy() != 0 {
                    return Err(SchemaError::OverlappingSignals {
                        id,
                        first: other.name.clone(),
                        second: signal.name.clone(),
                    });
                }
            }
            layouts.push(layout);
        }

        let checksum = match &definition.checksum {
            Some(spec) => Some(integrity_index(&definition, &spec.signal)?),
            None => None,
        };

        let counter = match &definition.counter {
            Some(name) => {
                let idx = integrity_index(&definition, name)?;
                if definition.signals[idx].signed {
                    return Err(SchemaError::SignedCounter {
                        id,
                        signal: name.clone(),
                    });
                }
                Some(idx)
            }
            None => None,
        };

        Ok(Self {
            definition,
            layouts,
            checksum,
            counter,
        })
    }

    /// Modulus of the rolling counter, if the message has one.
    pub fn counter_modulus(&self) -> Option<u64> {
        self.counter
            .map(|idx| self.layouts[idx].value_mask().wrapping_add(1))
    }
}

fn integrity_index(definition: &MessageDefinition, name: &str) -> Result<usize, SchemaError> {
    definition
        .signal_index(name)
        .ok_or_else(|| SchemaError::UnknownIntegritySignal {
            id: definition.id,
            signal: name.to_string(),
        })
}

/// Scale must be usable in both directions, and the declared physical range must fit the raw integer span.
fn check_scaling(id: Identifier, signal: &SignalDefinition) -> Result<(), SchemaError> {
    if !signal.scale.is_finite() || signal.scale == 0.0 || !signal.offset.is_finite() {
        return Err(SchemaError::InvalidScale {
            id,
            signal: signal.name.clone(),
        });
    }

    let Some((min, max)) = signal.range else {
        return Ok(());
    };

    let not_representable = || SchemaError::RangeNotRepresentable {
        id,
        signal: signal.name.clone(),
        min,
        max,
    };

    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(not_representable());
    }

    let a = ((min - signal.offset) / signal.scale).round();
    let b = ((max - signal.offset) / signal.scale).round();
    let (raw_lo, raw_hi) = (a.min(b), a.max(b));
    let (bound_lo, bound_hi) = signal.raw_bounds();

    if raw_lo < bound_lo as f64 || raw_hi > bound_hi as f64 {
        return Err(not_representable());
    }

    Ok(())
}

/// Serializable form of a schema. Converted into a [`MessageSchema`] through [`TryFrom`], which runs all validation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaDescription {
    pub version: u32,
    pub messages: Vec<MessageDefinition>,
}

/// Mapping from CAN identifier to message definition. Immutable after construction.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "SchemaDescription")
)]
pub struct MessageSchema {
    version: u32,
    messages: HashMap<Identifier, CompiledMessage>,
}

impl MessageSchema {
    /// Validate and build a schema. Any malformed message fails the whole schema.
    pub fn new(version: u32, messages: Vec<MessageDefinition>) -> Result<Self, SchemaError> {
        let mut compiled = HashMap::with_capacity(messages.len());

        for definition in messages {
            let id = definition.id;
            if compiled.contains_key(&id) {
                return Err(SchemaError::DuplicateMessage(id));
            }
            compiled.insert(id, CompiledMessage::new(definition)?);
        }

        Ok(Self {
            version,
            messages: compiled,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn lookup(&self, id: Identifier) -> Result<&MessageDefinition, SchemaError> {
        self.messages
            .get(&id)
            .map(|m| &m.definition)
            .ok_or(SchemaError::NotFound(id))
    }

    /// Signals of a message in declaration order.
    pub fn signals_of(&self, id: Identifier) -> Result<&[SignalDefinition], SchemaError> {
        self.lookup(id).map(|m| m.signals.as_slice())
    }

    pub fn messages(&self) -> impl Iterator<Item = &MessageDefinition> {
        self.messages.values().map(|m| &m.definition)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn compiled(&self, id: Identifier) -> Option<&CompiledMessage> {
        self.messages.get(&id)
    }
}

impl TryFrom<SchemaDescription> for MessageSchema {
    type Error = SchemaError;

    fn try_from(description: SchemaDescription) -> Result<Self, Self::Error> {
        MessageSchema::new(description.version, description.messages)
    }
}
