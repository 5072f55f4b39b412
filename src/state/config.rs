use crate::can::Identifier;
use crate::state::types::{CruiseButton, Gear, StateField};

const DEFAULT_MISS_TOLERANCE: f64 = 3.0;
const DEFAULT_STEER_OVERRIDE_THRESHOLD: f64 = 100.0;
const DEFAULT_GAS_PRESSED_THRESHOLD: f64 = 0.0;
const DEFAULT_BRAKE_PRESSED_THRESHOLD: f64 = 0.0;

pub const DEFAULT_GEAR_TABLE: &[(i64, Gear)] = &[
    (0, Gear::Park),
    (1, Gear::Reverse),
    (2, Gear::Neutral),
    (3, Gear::Drive),
];

pub const DEFAULT_BUTTON_TABLE: &[(i64, CruiseButton)] = &[
    (0, CruiseButton::None),
    (1, CruiseButton::Accel),
    (2, CruiseButton::Decel),
    (3, CruiseButton::Cancel),
    (4, CruiseButton::Main),
];

/// Source of a state field: one signal of one message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalBinding {
    pub field: StateField,
    pub message: Identifier,
    pub signal: String,
}

impl SignalBinding {
    pub fn new(field: StateField, message: Identifier, signal: &str) -> Self {
        Self {
            field,
            message,
            signal: signal.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregatorConfig {
    /// A message is stale after `miss_tolerance` expected periods without a valid frame.
    pub miss_tolerance: f64,
    /// `|driver torque|` above this counts as the driver steering
    pub steer_override_threshold: f64,
    pub gas_pressed_threshold: f64,
    pub brake_pressed_threshold: f64,
    pub bindings: Vec<SignalBinding>,
    /// Raw gear value to gear. Values missing from the table decode as [`Gear::Unknown`].
    pub gear_table: Vec<(i64, Gear)>,
    pub button_table: Vec<(i64, CruiseButton)>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            miss_tolerance: DEFAULT_MISS_TOLERANCE,
            steer_override_threshold: DEFAULT_STEER_OVERRIDE_THRESHOLD,
            gas_pressed_threshold: DEFAULT_GAS_PRESSED_THRESHOLD,
            brake_pressed_threshold: DEFAULT_BRAKE_PRESSED_THRESHOLD,
            bindings: vec![],
            gear_table: DEFAULT_GEAR_TABLE.to_vec(),
            button_table: DEFAULT_BUTTON_TABLE.to_vec(),
        }
    }
}

impl AggregatorConfig {
    pub fn bind(mut self, field: StateField, message: Identifier, signal: &str) -> Self {
        self.bindings.push(SignalBinding::new(field, message, signal));
        self
    }
}
