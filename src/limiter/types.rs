use strum_macros::Display;

use crate::limiter::LimiterFault;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LimiterState {
    #[default]
    Disabled,
    Enabled,
    FaultLatched,
}

/// Desired actuation for one control cycle, as produced by the planner.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ActuationRequest {
    pub steer_torque: f64,
    pub accel: f64,
    pub enable: bool,
}

impl ActuationRequest {
    pub fn new(steer_torque: f64, accel: f64, enable: bool) -> Self {
        Self {
            steer_torque,
            accel,
            enable,
        }
    }
}

/// Limited output of one control cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CommandResult {
    pub state: LimiterState,
    pub steer_torque: f64,
    /// Steering request bit. Only set while enabled.
    pub steer_active: bool,
    pub accel: f64,
    pub accel_active: bool,
    /// Latched fault, reported on every cycle until reset
    pub fault: Option<LimiterFault>,
}
