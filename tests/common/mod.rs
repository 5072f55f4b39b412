#![allow(dead_code)]
use std::time::Duration;

use vehicle_interface::can::{Frame, Identifier};
use vehicle_interface::codec::FrameEncoder;
use vehicle_interface::interface::{ActuatorMapping, InterfaceConfig};
use vehicle_interface::schema::{
    ChecksumAlgorithm, ChecksumSpec, MessageDefinition, MessageSchema, SignalDefinition,
};
use vehicle_interface::state::{CruiseButton, Gear, StateField, Tracked, VehicleState};

pub const SPEED: Identifier = Identifier::Standard(0xb4);
pub const BRAKE_MODULE: Identifier = Identifier::Standard(0x224);
pub const STEER_TORQUE_SENSOR: Identifier = Identifier::Standard(0x260);
pub const STEER_ANGLE_SENSOR: Identifier = Identifier::Standard(482);
pub const GEAR_PACKET: Identifier = Identifier::Standard(0x3bc);
pub const STEERING_LKA: Identifier = Identifier::Standard(0x2e4);
pub const ACC_CONTROL: Identifier = Identifier::Standard(0x343);

pub const CYCLE: Duration = Duration::from_millis(10);

fn sum_checksum() -> ChecksumSpec {
    let mut spec = ChecksumSpec::new("CHECKSUM", ChecksumAlgorithm::Sum);
    spec.include_address = true;
    spec.include_length = true;
    spec
}

/// Small sedan-like schema with sensors and both actuator messages.
pub fn schema() -> MessageSchema {
    let fast = Duration::from_millis(10);
    let slow = Duration::from_millis(20);

    let messages = vec![
        MessageDefinition::new(SPEED, "SPEED", 8, slow)
            .signal(
                SignalDefinition::new("SPEED", 40, 16)
                    .big_endian()
                    .scale(0.01, 0.0)
                    .unit("kph"),
            )
            .signal(SignalDefinition::new("CHECKSUM", 56, 8).big_endian())
            .checksum(sum_checksum()),
        MessageDefinition::new(BRAKE_MODULE, "BRAKE_MODULE", 8, slow)
            .signal(SignalDefinition::new("BRAKE_PRESSED", 0, 1)),
        MessageDefinition::new(STEER_TORQUE_SENSOR, "STEER_TORQUE_SENSOR", 8, slow)
            .signal(SignalDefinition::new("STEER_FAULT", 0, 1))
            .signal(SignalDefinition::new("STEER_TORQUE_DRIVER", 8, 16).big_endian().signed())
            .signal(SignalDefinition::new("STEER_TORQUE_EPS", 24, 16).big_endian().signed())
            .signal(SignalDefinition::new("CHECKSUM", 56, 8).big_endian())
            .checksum(sum_checksum()),
        MessageDefinition::new(STEER_ANGLE_SENSOR, "STEER_ANGLE_SENSOR", 8, fast)
            .signal(
                SignalDefinition::new("STEER_ANGLE", 24, 16)
                    .big_endian()
                    .signed()
                    .scale(0.1, 0.0)
                    .range(-500.0, 500.0)
                    .unit("deg"),
            )
            .signal(SignalDefinition::new("COUNTER", 56, 4))
            .counter("COUNTER"),
        MessageDefinition::new(GEAR_PACKET, "GEAR_PACKET", 8, Duration::ZERO)
            .signal(SignalDefinition::new("GEAR", 0, 4))
            .signal(SignalDefinition::new("LEFT_BLINKER", 4, 1))
            .signal(SignalDefinition::new("RIGHT_BLINKER", 5, 1)),
        MessageDefinition::new(STEERING_LKA, "STEERING_LKA", 5, fast)
            .signal(SignalDefinition::new("STEER_REQUEST", 0, 1))
            .signal(SignalDefinition::new("COUNTER", 1, 6).big_endian())
            .signal(SignalDefinition::new("STEER_TORQUE_CMD", 8, 16).big_endian().signed())
            .signal(SignalDefinition::new("LKA_STATE", 24, 8).default_value(3.0))
            .signal(SignalDefinition::new("CHECKSUM", 32, 8).big_endian())
            .counter("COUNTER")
            .checksum(sum_checksum()),
        MessageDefinition::new(ACC_CONTROL, "ACC_CONTROL", 8, slow)
            .signal(
                SignalDefinition::new("ACCEL_CMD", 0, 16)
                    .big_endian()
                    .signed()
                    .scale(0.001, 0.0)
                    .range(-20.0, 20.0)
                    .unit("m/s^2"),
            )
            .signal(SignalDefinition::new("ACC_ACTIVE", 16, 1))
            .signal(SignalDefinition::new("CHECKSUM", 56, 8).big_endian())
            .checksum(sum_checksum()),
    ];

    MessageSchema::new(1, messages).unwrap()
}

pub fn actuators() -> ActuatorMapping {
    ActuatorMapping {
        steer_message: STEERING_LKA,
        steer_torque_signal: "STEER_TORQUE_CMD".into(),
        steer_request_signal: "STEER_REQUEST".into(),
        accel_message: ACC_CONTROL,
        accel_signal: "ACCEL_CMD".into(),
        accel_active_signal: "ACC_ACTIVE".into(),
    }
}

pub fn config() -> InterfaceConfig {
    let mut config = InterfaceConfig::new(actuators());
    config.aggregator = config
        .aggregator
        .bind(StateField::VehicleSpeed, SPEED, "SPEED")
        .bind(StateField::BrakePedal, BRAKE_MODULE, "BRAKE_PRESSED")
        .bind(StateField::SteerFault, STEER_TORQUE_SENSOR, "STEER_FAULT")
        .bind(StateField::SteeringTorqueDriver, STEER_TORQUE_SENSOR, "STEER_TORQUE_DRIVER")
        .bind(StateField::SteeringTorqueEps, STEER_TORQUE_SENSOR, "STEER_TORQUE_EPS")
        .bind(StateField::SteeringAngle, STEER_ANGLE_SENSOR, "STEER_ANGLE")
        .bind(StateField::Gear, GEAR_PACKET, "GEAR")
        .bind(StateField::LeftBlinker, GEAR_PACKET, "LEFT_BLINKER")
        .bind(StateField::RightBlinker, GEAR_PACKET, "RIGHT_BLINKER");
    config
}

/// Simulated vehicle producing sensor frames.
pub struct Car<'a> {
    encoder: FrameEncoder<'a>,
    pub speed: f64,
    pub steering_angle: f64,
    pub driver_torque: f64,
    pub brake: bool,
    pub steer_fault: bool,
    pub gear: f64,
}

impl<'a> Car<'a> {
    pub fn new(schema: &'a MessageSchema) -> Self {
        Self {
            encoder: FrameEncoder::new(schema),
            speed: 50.0,
            steering_angle: 0.0,
            driver_torque: 0.0,
            brake: false,
            steer_fault: false,
            gear: 3.0,
        }
    }

    /// One frame of every sensor message, stamped with `now`.
    pub fn frames(&mut self, now: Duration) -> Vec<Frame> {
        let frames = vec![
            self.encoder.encode(SPEED, &[("SPEED", self.speed)]),
            self.encoder.encode(BRAKE_MODULE, &[("BRAKE_PRESSED", self.brake as u8 as f64)]),
            self.encoder.encode(
                STEER_TORQUE_SENSOR,
                &[
                    ("STEER_TORQUE_DRIVER", self.driver_torque),
                    ("STEER_FAULT", self.steer_fault as u8 as f64),
                ],
            ),
            self.encoder.encode(STEER_ANGLE_SENSOR, &[("STEER_ANGLE", self.steering_angle)]),
            self.encoder.encode(GEAR_PACKET, &[("GEAR", self.gear)]),
        ];

        frames
            .into_iter()
            .map(|frame| frame.unwrap().with_timestamp(now))
            .collect()
    }
}

fn fresh<T>(value: T) -> Tracked<T> {
    Tracked {
        value,
        timestamp: Some(Duration::ZERO),
        stale: false,
    }
}

/// Fresh vehicle state for driving the limiter directly.
pub fn vehicle_state(steering_pressed: bool, brake_pressed: bool) -> VehicleState {
    VehicleState {
        timestamp: Duration::ZERO,
        vehicle_speed: fresh(50.0),
        steering_angle: fresh(0.0),
        steering_torque_driver: fresh(if steering_pressed { 250.0 } else { 0.0 }),
        steering_torque_eps: fresh(0.0),
        gas_pedal: fresh(0.0),
        brake_pedal: fresh(brake_pressed as u8 as f64),
        gear: fresh(Gear::Drive),
        left_blinker: fresh(false),
        right_blinker: fresh(false),
        cruise_button: fresh(CruiseButton::None),
        left_blindspot: fresh(false),
        right_blindspot: fresh(false),
        steer_fault: fresh(false),
        accel_fault: fresh(false),
        steering_pressed: fresh(steering_pressed),
        gas_pressed: fresh(false),
        brake_pressed: fresh(brake_pressed),
    }
}

/// Small deterministic generator for property style tests.
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// Uniform in `[lo, hi)`
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = self.next_u64() as f64 / (1u64 << 31) as f64;
        lo + unit * (hi - lo)
    }

    pub fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}
