//! Types making up the vehicle state snapshot.
use std::time::Duration;

use strum_macros::{Display, EnumCount, EnumIter};

/// State fields that can be bound to a schema signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumCount, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateField {
    VehicleSpeed,
    SteeringAngle,
    SteeringTorqueDriver,
    SteeringTorqueEps,
    GasPedal,
    BrakePedal,
    Gear,
    LeftBlinker,
    RightBlinker,
    CruiseButton,
    LeftBlindspot,
    RightBlindspot,
    SteerFault,
    AccelFault,
}

/// Transmission gear. Raw values come through an explicit table, anything else is `Unknown`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Gear {
    Park,
    Reverse,
    Neutral,
    Drive,
    #[default]
    Unknown,
}

/// Steering wheel cruise control buttons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CruiseButton {
    None,
    Accel,
    Decel,
    Cancel,
    Main,
    #[default]
    Unknown,
}

/// A state value with the time of its last valid update.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tracked<T> {
    pub value: T,
    /// `None` until the first valid sample
    pub timestamp: Option<Duration>,
    /// No valid update within the expected refresh window. The value is the last known one.
    pub stale: bool,
}

impl<T> Tracked<T> {
    pub(crate) fn map<U>(self, f: impl FnOnce(T) -> U) -> Tracked<U> {
        Tracked {
            value: f(self.value),
            timestamp: self.timestamp,
            stale: self.stale,
        }
    }
}

/// Freshness of a state field, independent of its value type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub timestamp: Option<Duration>,
    pub stale: bool,
}

impl FieldMeta {
    /// Time since the last valid update, `None` if there never was one.
    pub fn age(&self, now: Duration) -> Option<Duration> {
        self.timestamp.map(|t| now.saturating_sub(t))
    }
}

/// Point-in-time vehicle state. Snapshots are owned copies, readers never observe a half-applied update.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleState {
    /// Time the snapshot was taken
    pub timestamp: Duration,

    pub vehicle_speed: Tracked<f64>,
    pub steering_angle: Tracked<f64>,
    pub steering_torque_driver: Tracked<f64>,
    pub steering_torque_eps: Tracked<f64>,
    pub gas_pedal: Tracked<f64>,
    pub brake_pedal: Tracked<f64>,
    pub gear: Tracked<Gear>,
    pub left_blinker: Tracked<bool>,
    pub right_blinker: Tracked<bool>,
    pub cruise_button: Tracked<CruiseButton>,
    pub left_blindspot: Tracked<bool>,
    pub right_blindspot: Tracked<bool>,
    pub steer_fault: Tracked<bool>,
    pub accel_fault: Tracked<bool>,

    /// Driver torque above the override threshold
    pub steering_pressed: Tracked<bool>,
    pub gas_pressed: Tracked<bool>,
    pub brake_pressed: Tracked<bool>,
}

impl VehicleState {
    pub fn meta(&self, field: StateField) -> FieldMeta {
        fn meta<T>(t: &Tracked<T>) -> FieldMeta {
            FieldMeta {
                timestamp: t.timestamp,
                stale: t.stale,
            }
        }

        match field {
            StateField::VehicleSpeed => meta(&self.vehicle_speed),
            StateField::SteeringAngle => meta(&self.steering_angle),
            StateField::SteeringTorqueDriver => meta(&self.steering_torque_driver),
            StateField::SteeringTorqueEps => meta(&self.steering_torque_eps),
            StateField::GasPedal => meta(&self.gas_pedal),
            StateField::BrakePedal => meta(&self.brake_pedal),
            StateField::Gear => meta(&self.gear),
            StateField::LeftBlinker => meta(&self.left_blinker),
            StateField::RightBlinker => meta(&self.right_blinker),
            StateField::CruiseButton => meta(&self.cruise_button),
            StateField::LeftBlindspot => meta(&self.left_blindspot),
            StateField::RightBlindspot => meta(&self.right_blindspot),
            StateField::SteerFault => meta(&self.steer_fault),
            StateField::AccelFault => meta(&self.accel_fault),
        }
    }
}
