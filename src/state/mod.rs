//! Vehicle state aggregation.
//!
//! The [`StateAggregator`] folds decoded frames into one coherent [`VehicleState`]. It is the single writer of the state, readers get owned snapshots.
//!
//! Only frames that passed their integrity checks update the state. Invalid frames keep the previous good value and bump a per-field counter. Each field goes stale when its source message has not delivered a valid frame within `miss_tolerance` expected periods; stale fields still report their last value.

pub mod config;
pub mod types;

use std::collections::HashMap;
use std::time::Duration;

use strum::EnumCount;
use tracing::debug;

use crate::can::Identifier;
use crate::codec::DecodedSignalSet;
use crate::schema::{MessageSchema, SchemaError};

pub use config::{AggregatorConfig, SignalBinding};
pub use types::*;

#[derive(Debug, Copy, Clone)]
struct FieldSlot {
    message: Identifier,
    value: f64,
    timestamp: Option<Duration>,
    invalid_samples: u64,
}

#[derive(Debug, Copy, Clone)]
struct MessageTracker {
    period: Duration,
    last_valid: Option<Duration>,
}

pub struct StateAggregator {
    config: AggregatorConfig,
    slots: [Option<FieldSlot>; StateField::COUNT],
    /// Message to `(signal index, field)` pairs fed by it
    by_message: HashMap<Identifier, Vec<(usize, StateField)>>,
    messages: HashMap<Identifier, MessageTracker>,
}

impl StateAggregator {
    /// Resolve all bindings against the schema. Bindings to unknown messages or signals are rejected here, not at runtime.
    pub fn new(schema: &MessageSchema, config: AggregatorConfig) -> Result<Self, SchemaError> {
        let mut slots = [None; StateField::COUNT];
        let mut by_message: HashMap<Identifier, Vec<(usize, StateField)>> = HashMap::new();
        let mut messages = HashMap::new();

        for binding in &config.bindings {
            let unknown = || SchemaError::UnknownBinding {
                id: binding.message,
                signal: binding.signal.clone(),
            };

            let message = schema.lookup(binding.message).map_err(|_| unknown())?;
            let idx = message.signal_index(&binding.signal).ok_or_else(unknown)?;

            let slot = &mut slots[binding.field as usize];
            if slot.is_some() {
                return Err(SchemaError::DuplicateBinding(binding.field.to_string()));
            }
            *slot = Some(FieldSlot {
                message: binding.message,
                value: 0.0,
                timestamp: None,
                invalid_samples: 0,
            });

            by_message
                .entry(binding.message)
                .or_default()
                .push((idx, binding.field));
            messages.insert(
                binding.message,
                MessageTracker {
                    period: message.period,
                    last_valid: None,
                },
            );
        }

        Ok(Self {
            config,
            slots,
            by_message,
            messages,
        })
    }

    /// Fold one decoded frame into the state.
    pub fn update(&mut self, set: &DecodedSignalSet) {
        let Some(bound) = self.by_message.get(&set.id) else {
            return;
        };

        if !set.is_valid() {
            debug!(
                "{}: dropping invalid frame (checksum {}, counter {})",
                set.id, set.checksum_valid, set.counter_valid
            );
            for &(_, field) in bound {
                if let Some(slot) = self.slots[field as usize].as_mut() {
                    slot.invalid_samples += 1;
                }
            }
            return;
        }

        if let Some(tracker) = self.messages.get_mut(&set.id) {
            tracker.last_valid = Some(match tracker.last_valid {
                Some(last) => last.max(set.timestamp),
                None => set.timestamp,
            });
        }

        for &(idx, field) in bound {
            let slot = self.slots[field as usize].as_mut();
            let (Some(slot), Some(signal)) = (slot, set.signals.get(idx)) else {
                continue;
            };
            slot.value = signal.value;
            slot.timestamp = Some(set.timestamp);
        }
    }

    /// Whether a message has gone without a valid frame for longer than its tolerance window. Messages with a zero period never go stale once received.
    pub fn message_stale(&self, id: Identifier, now: Duration) -> bool {
        match self.messages.get(&id) {
            Some(MessageTracker {
                last_valid: Some(last),
                period,
            }) => {
                let window = period.as_nanos() as f64 * self.config.miss_tolerance;
                !period.is_zero() && now.saturating_sub(*last).as_nanos() as f64 > window
            }
            _ => true,
        }
    }

    /// Frames dropped for a field because they failed integrity checks.
    pub fn invalid_samples(&self, field: StateField) -> u64 {
        self.slots[field as usize]
            .map(|slot| slot.invalid_samples)
            .unwrap_or(0)
    }

    fn tracked(&self, field: StateField, now: Duration) -> Tracked<f64> {
        match self.slots[field as usize] {
            Some(slot) => Tracked {
                value: slot.value,
                timestamp: slot.timestamp,
                stale: self.message_stale(slot.message, now),
            },
            None => Tracked {
                value: 0.0,
                timestamp: None,
                stale: true,
            },
        }
    }

    fn flag(&self, field: StateField, now: Duration) -> Tracked<bool> {
        self.tracked(field, now).map(|v| v != 0.0)
    }

    /// Enumerated field through its table. `Unknown` until a valid sample arrived.
    fn enumerated<T: Copy + Default>(
        &self,
        field: StateField,
        table: &[(i64, T)],
        now: Duration,
    ) -> Tracked<T> {
        let tracked = self.tracked(field, now);
        match tracked.timestamp {
            Some(_) => tracked.map(|raw| lookup(table, raw)),
            None => tracked.map(|_| T::default()),
        }
    }

    /// Owned copy of the state as of `now`. Composite fields are derived here from the latest validated components.
    pub fn snapshot(&self, now: Duration) -> VehicleState {
        let steering_torque_driver = self.tracked(StateField::SteeringTorqueDriver, now);
        let gas_pedal = self.tracked(StateField::GasPedal, now);
        let brake_pedal = self.tracked(StateField::BrakePedal, now);

        let gear = self.enumerated(StateField::Gear, &self.config.gear_table, now);
        let cruise_button =
            self.enumerated(StateField::CruiseButton, &self.config.button_table, now);

        let steer_threshold = self.config.steer_override_threshold;
        let gas_threshold = self.config.gas_pressed_threshold;
        let brake_threshold = self.config.brake_pressed_threshold;

        VehicleState {
            timestamp: now,
            vehicle_speed: self.tracked(StateField::VehicleSpeed, now),
            steering_angle: self.tracked(StateField::SteeringAngle, now),
            steering_torque_driver,
            steering_torque_eps: self.tracked(StateField::SteeringTorqueEps, now),
            gas_pedal,
            brake_pedal,
            gear,
            left_blinker: self.flag(StateField::LeftBlinker, now),
            right_blinker: self.flag(StateField::RightBlinker, now),
            cruise_button,
            left_blindspot: self.flag(StateField::LeftBlindspot, now),
            right_blindspot: self.flag(StateField::RightBlindspot, now),
            steer_fault: self.flag(StateField::SteerFault, now),
            accel_fault: self.flag(StateField::AccelFault, now),
            steering_pressed: steering_torque_driver.map(|t| t.abs() > steer_threshold),
            gas_pressed: gas_pedal.map(|g| g > gas_threshold),
            brake_pressed: brake_pedal.map(|b| b > brake_threshold),
        }
    }

    /// Forget all received values, e.g. at the start of a new session.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.value = 0.0;
            slot.timestamp = None;
            slot.invalid_samples = 0;
        }
        for tracker in self.messages.values_mut() {
            tracker.last_valid = None;
        }
    }
}

/// Table lookup for enumerated signals. Fractional or unlisted raw values map to the type's default, which is always its `Unknown` variant.
fn lookup<T: Copy + Default>(table: &[(i64, T)], raw: f64) -> T {
    if raw.fract() != 0.0 {
        return T::default();
    }
    table
        .iter()
        .find(|(value, _)| *value as f64 == raw)
        .map(|(_, t)| *t)
        .unwrap_or_default()
}
