use std::time::Duration;

use crate::state::StateField;

const DEFAULT_STEER_MAX: f64 = 1500.0;
const DEFAULT_STEER_DELTA_UP: f64 = 15.0;
const DEFAULT_STEER_DELTA_DOWN: f64 = 25.0;
const DEFAULT_STEER_ERROR_MAX: f64 = 350.0;
const DEFAULT_ACCEL_MIN: f64 = -3.5;
const DEFAULT_ACCEL_MAX: f64 = 2.0;
const DEFAULT_ACCEL_NEUTRAL: f64 = 0.0;
const DEFAULT_OVERRIDE_CYCLES: u32 = 5;
const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_millis(250);
const DEFAULT_MAX_MISSED_CYCLES: u32 = 5;

/// Safety envelope of the command limiter. Torque values are in the raw units of the steering command signal, acceleration in m/s².
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimiterConfig {
    pub steer_max: f64,
    /// Max torque increase in magnitude per cycle
    pub steer_delta_up: f64,
    /// Max torque decrease in magnitude per cycle
    pub steer_delta_down: f64,
    pub steer_error_max: f64,
    pub accel_min: f64,
    pub accel_max: f64,
    /// Output while not enabled
    pub accel_neutral: f64,
    /// Consecutive cycles of driver steering input that disengage
    pub override_cycles: u32,
    pub stale_timeout: Duration,
    pub max_missed_cycles: u32,
    pub required_fields: Vec<StateField>,
    pub disengage_on_brake: bool,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        LimiterConfig {
            steer_max: DEFAULT_STEER_MAX,
            steer_delta_up: DEFAULT_STEER_DELTA_UP,
            steer_delta_down: DEFAULT_STEER_DELTA_DOWN,
            steer_error_max: DEFAULT_STEER_ERROR_MAX,
            accel_min: DEFAULT_ACCEL_MIN,
            accel_max: DEFAULT_ACCEL_MAX,
            accel_neutral: DEFAULT_ACCEL_NEUTRAL,
            override_cycles: DEFAULT_OVERRIDE_CYCLES,
            stale_timeout: DEFAULT_STALE_TIMEOUT,
            max_missed_cycles: DEFAULT_MAX_MISSED_CYCLES,
            required_fields: vec![StateField::SteeringTorqueDriver, StateField::VehicleSpeed],
            disengage_on_brake: true,
        }
    }
}
