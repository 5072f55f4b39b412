//! Actuation command limiter.
//!
//! Turns the planner's desired steering torque and acceleration into values that are safe to put on the bus. Steering torque is rate limited with asymmetric limits (releasing torque may be faster than applying it) and clamped to an absolute maximum. Driver override always wins: while the driver steers, torque ramps to zero whatever the request.
//!
//! The limiter is a small state machine over [`LimiterState`]. Faults latch in [`LimiterState::FaultLatched`] and are only cleared by [`CommandLimiter::reset_fault`], never automatically.
//!
//! ```
//! use vehicle_interface::limiter::{CommandLimiter, LimiterConfig, LimiterState};
//!
//! let limiter = CommandLimiter::new(LimiterConfig::default());
//! assert_eq!(limiter.state(), LimiterState::Disabled);
//! assert_eq!(limiter.applied_torque(), 0.0);
//! ```

pub mod config;
pub mod error;
pub mod types;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::state::{StateField, Tracked, VehicleState};

pub use config::LimiterConfig;
pub use error::LimiterFault;
pub use types::*;

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Value is set and not stale
fn asserted(flag: &Tracked<bool>) -> bool {
    flag.value && !flag.stale
}

pub struct CommandLimiter {
    config: LimiterConfig,
    state: LimiterState,
    applied_torque: f64,
    applied_accel: f64,
    override_count: u32,
    missed_cycles: u32,
    fault: Option<LimiterFault>,
    fault_time: Option<Duration>,
    last_enable: bool,
}

impl CommandLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        let applied_accel = config.accel_neutral;
        Self {
            config,
            state: LimiterState::Disabled,
            applied_torque: 0.0,
            applied_accel,
            override_count: 0,
            missed_cycles: 0,
            fault: None,
            fault_time: None,
            last_enable: false,
        }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    pub fn state(&self) -> LimiterState {
        self.state
    }

    pub fn fault(&self) -> Option<LimiterFault> {
        self.fault
    }

    /// Time the current fault was latched
    pub fn fault_time(&self) -> Option<Duration> {
        self.fault_time
    }

    pub fn applied_torque(&self) -> f64 {
        self.applied_torque
    }

    pub fn applied_accel(&self) -> f64 {
        self.applied_accel
    }

    fn set_state(&mut self, state: LimiterState, reason: &str) {
        if self.state != state {
            info!("Limiter {} -> {}: {}", self.state, state, reason);
            self.state = state;
        }
    }

    fn latch(&mut self, fault: LimiterFault, now: Duration) {
        warn!("Limiter fault latched: {}", fault);
        self.fault = Some(fault);
        self.fault_time = Some(now);
        self.override_count = 0;
        self.set_state(LimiterState::FaultLatched, "fault");
    }

    /// First required field that is stale and has not been refreshed for longer than the stale timeout.
    fn timed_out_field(&self, vehicle: &VehicleState, now: Duration) -> Option<StateField> {
        self.config.required_fields.iter().copied().find(|&field| {
            let meta = vehicle.meta(field);
            meta.stale && meta.age(now).map_or(true, |age| age > self.config.stale_timeout)
        })
    }

    fn stale_field(&self, vehicle: &VehicleState) -> Option<StateField> {
        self.config
            .required_fields
            .iter()
            .copied()
            .find(|&field| vehicle.meta(field).stale)
    }

    /// Next applied torque towards `target`. Moving away from zero is limited by the up rate, moving towards (or across) zero by the down rate.
    fn rate_limit(&self, target: f64) -> f64 {
        let prev = self.applied_torque;
        let up = self.config.steer_delta_up;
        let down = self.config.steer_delta_down;

        let next = if prev > 0.0 {
            clamp(target, (prev - down).max(-up), prev + up)
        } else {
            clamp(target, prev - up, (prev + down).min(up))
        };

        clamp(next, -self.config.steer_max, self.config.steer_max)
    }

    fn transition(
        &mut self,
        request: &ActuationRequest,
        vehicle: &VehicleState,
        now: Duration,
        rising: bool,
    ) {
        match self.state {
            LimiterState::Disabled => {
                if !rising {
                    return;
                }
                if let Some(field) = self.stale_field(vehicle) {
                    debug!("Enable refused, {} is stale", field);
                } else if asserted(&vehicle.steer_fault) {
                    debug!("Enable refused, steering fault reported");
                } else {
                    self.override_count = 0;
                    self.set_state(LimiterState::Enabled, "enable requested");
                }
            }
            LimiterState::Enabled => {
                if !request.steer_torque.is_finite() || !request.accel.is_finite() {
                    self.latch(LimiterFault::RangeViolation, now);
                    return;
                }
                if let Some(field) = self.timed_out_field(vehicle, now) {
                    self.latch(LimiterFault::StaleInput(field), now);
                    return;
                }

                if asserted(&vehicle.steering_pressed) {
                    self.override_count += 1;
                } else {
                    self.override_count = 0;
                }

                if !request.enable {
                    self.set_state(LimiterState::Disabled, "disable requested");
                } else if self.override_count >= self.config.override_cycles {
                    self.set_state(LimiterState::Disabled, "driver override");
                } else if self.config.disengage_on_brake && asserted(&vehicle.brake_pressed) {
                    self.set_state(LimiterState::Disabled, "brake pressed");
                } else if asserted(&vehicle.steer_fault) {
                    self.set_state(LimiterState::Disabled, "steering fault reported");
                }
            }
            LimiterState::FaultLatched => {}
        }
    }

    /// Run one control cycle.
    pub fn update(
        &mut self,
        request: &ActuationRequest,
        vehicle: &VehicleState,
        now: Duration,
    ) -> CommandResult {
        let rising = request.enable && !self.last_enable;
        self.last_enable = request.enable;
        self.missed_cycles = 0;

        self.transition(request, vehicle, now, rising);

        let overriding = asserted(&vehicle.steering_pressed);
        let steering = self.state == LimiterState::Enabled && !overriding;
        let target = if steering {
            clamp(request.steer_torque, -self.config.steer_max, self.config.steer_max)
        } else {
            0.0
        };

        let mut torque = self.rate_limit(target);
        if steering && (target - torque).abs() > self.config.steer_error_max {
            self.latch(LimiterFault::RateViolation, now);
            torque = self.rate_limit(0.0);
        }
        self.applied_torque = torque;

        let enabled = self.state == LimiterState::Enabled;
        let accel = if enabled {
            request.accel
        } else {
            self.config.accel_neutral
        };
        let accel = clamp(accel, self.config.accel_min, self.config.accel_max);
        self.applied_accel = accel;

        CommandResult {
            state: self.state,
            steer_torque: torque,
            steer_active: enabled,
            accel,
            accel_active: enabled,
            fault: self.fault,
        }
    }

    /// Record a control cycle that did not run. Too many in a row while enabled latches a fault.
    pub fn skip_cycle(&mut self, now: Duration) {
        self.missed_cycles = self.missed_cycles.saturating_add(1);
        debug!("Missed control cycle ({} in a row)", self.missed_cycles);

        let exceeded = self.missed_cycles > self.config.max_missed_cycles;
        if self.state == LimiterState::Enabled && exceeded {
            self.latch(LimiterFault::MissedDeadlines(self.missed_cycles), now);
        }
    }

    /// Clear a latched fault. Refused, returning the fault, while a required field is stale. The limiter comes back `Disabled` and needs a new enable edge.
    pub fn reset_fault(&mut self, vehicle: &VehicleState) -> Result<(), LimiterFault> {
        let Some(fault) = self.fault else {
            return Ok(());
        };

        if let Some(field) = self.stale_field(vehicle) {
            warn!("Fault reset refused, {} is stale", field);
            return Err(fault);
        }

        self.fault = None;
        self.fault_time = None;
        self.missed_cycles = 0;
        self.override_count = 0;
        self.set_state(LimiterState::Disabled, "fault reset");
        Ok(())
    }
}
