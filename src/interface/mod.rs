//! Vehicle interface tying decoder, aggregator, limiter and encoder together.
//!
//! Frames from the bus go through [`VehicleInterface::process`]. Once per control cycle the caller reads the state, runs its planner and hands the desired actuation to [`VehicleInterface::command`], which returns the frames to transmit. A cycle that cannot run in time is reported with [`VehicleInterface::skip_cycle`].
//!
//! ## Example
//! ```rust
//! use vehicle_interface::interface::{ActuatorMapping, InterfaceConfig, VehicleInterface};
//! use vehicle_interface::schema::{MessageDefinition, MessageSchema, SignalDefinition};
//! use std::time::Duration;
//!
//! let command = MessageDefinition::new(0x2e4.into(), "STEERING_LKA", 8, Duration::from_millis(10))
//!     .signal(SignalDefinition::new("STEER_REQUEST", 0, 1))
//!     .signal(SignalDefinition::new("STEER_TORQUE_CMD", 8, 16).big_endian().signed())
//!     .signal(SignalDefinition::new("ACCEL_CMD", 24, 16).big_endian().signed().scale(0.001, 0.0))
//!     .signal(SignalDefinition::new("ACC_ACTIVE", 40, 1));
//! let schema = MessageSchema::new(1, vec![command]).unwrap();
//!
//! let actuators = ActuatorMapping {
//!     steer_message: 0x2e4.into(),
//!     steer_torque_signal: "STEER_TORQUE_CMD".into(),
//!     steer_request_signal: "STEER_REQUEST".into(),
//!     accel_message: 0x2e4.into(),
//!     accel_signal: "ACCEL_CMD".into(),
//!     accel_active_signal: "ACC_ACTIVE".into(),
//! };
//! let mut vehicle = VehicleInterface::new(&schema, InterfaceConfig::new(actuators)).unwrap();
//!
//! // Nothing received yet, the limiter refuses to engage
//! let output = vehicle.command(100.0, 0.5, true).unwrap();
//! assert!(!output.result.steer_active);
//! assert_eq!(output.frames.len(), 1);
//! ```

pub mod config;

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::debug;

use crate::can::{Frame, Identifier};
use crate::codec::{DecodeError, FrameDecoder, FrameEncoder};
use crate::limiter::{ActuationRequest, CommandLimiter, CommandResult, LimiterFault, LimiterState};
use crate::schema::MessageSchema;
use crate::state::{StateAggregator, StateField, VehicleState};
use crate::Result;

pub use config::{ActuatorMapping, InterfaceConfig};

/// Result of one control cycle together with the frames that carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub result: CommandResult,
    pub frames: Vec<Frame>,
}

/// Single owner of the decode, state and command pipeline for one bus. All methods taking `now` expect time relative to the start of the session, the same clock as frame timestamps. The variants without `now` use the time since construction.
pub struct VehicleInterface<'a> {
    bus: u8,
    actuators: ActuatorMapping,
    decoder: FrameDecoder<'a>,
    encoder: FrameEncoder<'a>,
    aggregator: StateAggregator,
    limiter: CommandLimiter,
    start: Instant,
    state_sender: watch::Sender<VehicleState>,
}

impl<'a> VehicleInterface<'a> {
    pub fn new(schema: &'a MessageSchema, config: InterfaceConfig) -> Result<Self> {
        config.actuators.validate(schema)?;
        let aggregator = StateAggregator::new(schema, config.aggregator)?;
        let (state_sender, _) = watch::channel(aggregator.snapshot(Duration::ZERO));

        Ok(Self {
            bus: config.bus,
            actuators: config.actuators,
            decoder: FrameDecoder::new(schema),
            encoder: FrameEncoder::new(schema),
            aggregator,
            limiter: CommandLimiter::new(config.limiter),
            start: Instant::now(),
            state_sender,
        })
    }

    /// Time since the interface was created.
    pub fn now(&self) -> Duration {
        self.start.elapsed()
    }

    /// Feed one received frame. Frames from other busses and our own loopback frames are skipped. Unknown messages come back as [`DecodeError::UnknownMessage`] and can be ignored, frames with the wrong length are dropped.
    pub fn process(&mut self, frame: &Frame) -> std::result::Result<(), DecodeError> {
        if frame.bus != self.bus || frame.loopback {
            return Ok(());
        }

        match self.decoder.decode(frame) {
            Ok(set) => {
                self.aggregator.update(&set);
                Ok(())
            }
            Err(e @ DecodeError::LengthMismatch { .. }) => {
                debug!("Dropping frame: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Feed a batch of frames, ignoring frames that do not decode.
    pub fn process_all<'f>(&mut self, frames: impl IntoIterator<Item = &'f Frame>) {
        for frame in frames {
            let _ = self.process(frame);
        }
    }

    pub fn get_state(&self) -> VehicleState {
        self.state_at(self.now())
    }

    pub fn state_at(&self, now: Duration) -> VehicleState {
        self.aggregator.snapshot(now)
    }

    /// Receiver of the state snapshot used by the most recent control cycle.
    pub fn subscribe(&self) -> watch::Receiver<VehicleState> {
        self.state_sender.subscribe()
    }

    pub fn command(
        &mut self,
        steer_torque: f64,
        accel: f64,
        enable: bool,
    ) -> Result<CommandOutput> {
        let now = self.now();
        self.command_at(now, steer_torque, accel, enable)
    }

    /// Run one control cycle at `now` and encode its outcome. One frame per actuator message.
    pub fn command_at(
        &mut self,
        now: Duration,
        steer_torque: f64,
        accel: f64,
        enable: bool,
    ) -> Result<CommandOutput> {
        let state = self.aggregator.snapshot(now);
        let request = ActuationRequest::new(steer_torque, accel, enable);
        let result = self.limiter.update(&request, &state, now);
        self.state_sender.send_replace(state);

        let a = &self.actuators;
        let steer = [
            (a.steer_torque_signal.as_str(), result.steer_torque),
            (a.steer_request_signal.as_str(), flag(result.steer_active)),
        ];
        let accel = [
            (a.accel_signal.as_str(), result.accel),
            (a.accel_active_signal.as_str(), flag(result.accel_active)),
        ];

        let mut frames = vec![];
        if a.steer_message == a.accel_message {
            let values = [steer, accel].concat();
            frames.push(self.encoder.encode(a.steer_message, &values)?);
        } else {
            frames.push(self.encoder.encode(a.steer_message, &steer)?);
            frames.push(self.encoder.encode(a.accel_message, &accel)?);
        }

        for frame in frames.iter_mut() {
            frame.bus = self.bus;
            frame.timestamp = now;
        }

        Ok(CommandOutput { result, frames })
    }

    /// Clear a latched limiter fault once the required inputs are fresh again.
    pub fn reset_fault(&mut self) -> std::result::Result<(), LimiterFault> {
        let now = self.now();
        self.reset_fault_at(now)
    }

    pub fn reset_fault_at(&mut self, now: Duration) -> std::result::Result<(), LimiterFault> {
        let state = self.aggregator.snapshot(now);
        self.limiter.reset_fault(&state)
    }

    /// Report a control cycle that did not run. No frames are produced for it.
    pub fn skip_cycle(&mut self) {
        let now = self.now();
        self.skip_cycle_at(now);
    }

    pub fn skip_cycle_at(&mut self, now: Duration) {
        self.limiter.skip_cycle(now);
    }

    pub fn limiter_state(&self) -> LimiterState {
        self.limiter.state()
    }

    pub fn counter_misses(&self, id: Identifier) -> u64 {
        self.decoder.counter_misses(id)
    }

    pub fn invalid_samples(&self, field: StateField) -> u64 {
        self.aggregator.invalid_samples(field)
    }

    /// Start a new session. Received state, rolling counters and limiter state are discarded.
    pub fn reset(&mut self) {
        let config = self.limiter.config().clone();
        self.limiter = CommandLimiter::new(config);
        self.aggregator.reset();
        self.decoder.reset();
        self.encoder.reset();
        self.start = Instant::now();
        self.state_sender.send_replace(self.aggregator.snapshot(Duration::ZERO));
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
