mod common;

use std::time::Duration;

use common::*;
use vehicle_interface::can::Frame;
use vehicle_interface::codec::{DecodeError, FrameDecoder};
use vehicle_interface::interface::{CommandOutput, VehicleInterface};
use vehicle_interface::limiter::{LimiterFault, LimiterState};
use vehicle_interface::schema::SchemaError;
use vehicle_interface::state::{Gear, StateField};

fn cycle(
    vehicle: &mut VehicleInterface,
    car: &mut Car,
    now: Duration,
    steer: f64,
    accel: f64,
    enable: bool,
) -> CommandOutput {
    for frame in car.frames(now) {
        vehicle.process(&frame).unwrap();
    }
    vehicle.command_at(now, steer, accel, enable).unwrap()
}

#[test]
fn steering_angle_scenario() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();

    // Raw 300 at bits [24, 40)
    let frame = Frame::new(0, STEER_ANGLE_SENSOR, &[0x00, 0x00, 0x00, 0x01, 0x2c, 0x00, 0x00, 0x00])
        .unwrap()
        .with_timestamp(Duration::from_millis(5));
    vehicle.process(&frame).unwrap();

    let state = vehicle.state_at(Duration::from_millis(10));
    assert!((state.steering_angle.value - 30.0).abs() < 1e-9);
    assert_eq!(state.steering_angle.timestamp, Some(Duration::from_millis(5)));
    assert!(!state.steering_angle.stale);
}

#[test]
fn engage_and_ramp() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);
    let mut decoder = FrameDecoder::new(&schema);

    for i in 1..=10u32 {
        let now = CYCLE * i;
        let output = cycle(&mut vehicle, &mut car, now, 200.0, 0.5, true);
        assert_eq!(output.result.state, LimiterState::Enabled);
        assert_eq!(output.result.steer_torque, 15.0 * i as f64);
        assert_eq!(output.frames.len(), 2);

        let lka = &output.frames[0];
        assert_eq!(lka.id, STEERING_LKA);
        assert_eq!(lka.bus, 0);
        assert_eq!(lka.timestamp, now);

        let set = decoder.decode(lka).unwrap();
        assert!(set.is_valid());
        assert_eq!(set.value("STEER_TORQUE_CMD"), Some(15.0 * i as f64));
        assert_eq!(set.value("STEER_REQUEST"), Some(1.0));
        assert_eq!(set.value("LKA_STATE"), Some(3.0));
        assert_eq!(set.value("COUNTER"), Some((i - 1) as f64));

        let acc = decoder.decode(&output.frames[1]).unwrap();
        assert!(acc.is_valid());
        assert!((acc.value("ACCEL_CMD").unwrap() - 0.5).abs() < 0.001);
        assert_eq!(acc.value("ACC_ACTIVE"), Some(1.0));
    }

    let state = vehicle.get_state();
    assert_eq!(state.gear.value, Gear::Drive);
    assert!((state.vehicle_speed.value - 50.0).abs() < 0.01);
}

#[test]
fn driver_override_disables_after_five_cycles() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);
    let mut decoder = FrameDecoder::new(&schema);

    for i in 1..=4 {
        cycle(&mut vehicle, &mut car, CYCLE * i, 100.0, 0.0, true);
    }
    assert_eq!(vehicle.limiter_state(), LimiterState::Enabled);

    car.driver_torque = 250.0;
    for i in 5..=8 {
        let output = cycle(&mut vehicle, &mut car, CYCLE * i, 100.0, 0.0, true);
        assert_eq!(output.result.state, LimiterState::Enabled);
    }

    // No disable request was sent
    let output = cycle(&mut vehicle, &mut car, CYCLE * 9, 100.0, 0.0, true);
    assert_eq!(output.result.state, LimiterState::Disabled);
    assert_eq!(output.result.fault, None);
    assert!(!output.result.steer_active);

    let set = decoder.decode(&output.frames[0]).unwrap();
    assert_eq!(set.value("STEER_REQUEST"), Some(0.0));
}

#[test]
fn fault_latch_until_reset() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);

    cycle(&mut vehicle, &mut car, CYCLE, 0.0, 0.0, true);
    let output = cycle(&mut vehicle, &mut car, CYCLE * 2, 1000.0, 1.0, true);
    assert_eq!(output.result.state, LimiterState::FaultLatched);
    assert_eq!(output.result.fault, Some(LimiterFault::RateViolation));

    for (i, enable) in [false, true, false, true].into_iter().enumerate() {
        let output = cycle(&mut vehicle, &mut car, CYCLE * (3 + i as u32), 100.0, 1.0, enable);
        assert_eq!(output.result.state, LimiterState::FaultLatched);
        assert_eq!(output.result.fault, Some(LimiterFault::RateViolation));
        assert!(!output.result.steer_active);
        assert!(!output.result.accel_active);
        assert_eq!(output.result.steer_torque, 0.0);
        assert_eq!(output.result.accel, 0.0);
    }

    assert_eq!(vehicle.reset_fault_at(CYCLE * 7), Ok(()));
    assert_eq!(vehicle.limiter_state(), LimiterState::Disabled);

    // Enable was still held, a new edge is required
    let output = cycle(&mut vehicle, &mut car, CYCLE * 8, 0.0, 0.0, true);
    assert_eq!(output.result.state, LimiterState::Disabled);
    cycle(&mut vehicle, &mut car, CYCLE * 9, 0.0, 0.0, false);
    let output = cycle(&mut vehicle, &mut car, CYCLE * 10, 0.0, 0.0, true);
    assert_eq!(output.result.state, LimiterState::Enabled);
    assert_eq!(output.result.fault, None);
}

#[test]
fn stale_inputs_latch_fault() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);

    cycle(&mut vehicle, &mut car, CYCLE, 0.0, 0.0, true);

    // Sensors go quiet after 10 ms
    for i in 2..=26 {
        let output = vehicle.command_at(CYCLE * i, 0.0, 0.0, true).unwrap();
        assert_eq!(output.result.state, LimiterState::Enabled, "cycle {}", i);
    }
    let state = vehicle.state_at(CYCLE * 26);
    assert!(state.steering_torque_driver.stale);
    assert!(state.vehicle_speed.stale);
    assert!((state.vehicle_speed.value - 50.0).abs() < 0.01);

    let output = vehicle.command_at(CYCLE * 27, 0.0, 0.0, true).unwrap();
    assert_eq!(output.result.state, LimiterState::FaultLatched);
    assert_eq!(
        output.result.fault,
        Some(LimiterFault::StaleInput(StateField::SteeringTorqueDriver))
    );

    let refused = vehicle.reset_fault_at(CYCLE * 28);
    assert_eq!(refused, Err(LimiterFault::StaleInput(StateField::SteeringTorqueDriver)));

    let err: vehicle_interface::Error = refused.unwrap_err().into();
    assert_eq!(err.to_string(), "Required field SteeringTorqueDriver is stale");

    vehicle.process_all(&car.frames(CYCLE * 29));
    assert_eq!(vehicle.reset_fault_at(CYCLE * 29), Ok(()));
}

#[test]
fn staleness_window() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);

    vehicle.process_all(&car.frames(Duration::from_millis(100)));

    // Speed is sent every 20 ms with a tolerance of 3 periods
    assert!(!vehicle.state_at(Duration::from_millis(160)).vehicle_speed.stale);
    assert!(vehicle.state_at(Duration::from_millis(161)).vehicle_speed.stale);

    // Gear is event driven
    assert!(!vehicle.state_at(Duration::from_secs(100)).gear.stale);
}

#[test]
fn missed_deadlines() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);

    cycle(&mut vehicle, &mut car, CYCLE, 0.0, 0.0, true);
    for i in 2..=7 {
        vehicle.skip_cycle_at(CYCLE * i);
    }
    assert_eq!(vehicle.limiter_state(), LimiterState::FaultLatched);

    let output = cycle(&mut vehicle, &mut car, CYCLE * 8, 0.0, 0.0, true);
    assert_eq!(output.result.fault, Some(LimiterFault::MissedDeadlines(6)));
}

#[test]
fn subscribers_see_cycle_snapshot() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);
    let mut rx = vehicle.subscribe();

    assert!(!rx.has_changed().unwrap());
    assert!(rx.borrow().vehicle_speed.stale);

    car.speed = 72.5;
    cycle(&mut vehicle, &mut car, CYCLE, 0.0, 0.0, false);

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.timestamp, CYCLE);
    assert!((state.vehicle_speed.value - 72.5).abs() < 0.01);
    assert!(!state.vehicle_speed.stale);
}

#[test]
fn other_bus_and_loopback_ignored() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);

    for mut frame in car.frames(CYCLE) {
        frame.bus = 1;
        vehicle.process(&frame).unwrap();
    }
    for mut frame in car.frames(CYCLE) {
        frame.loopback = true;
        vehicle.process(&frame).unwrap();
    }

    let state = vehicle.state_at(CYCLE);
    assert!(state.vehicle_speed.stale);
    assert_eq!(state.vehicle_speed.timestamp, None);
}

#[test]
fn integrity_failures_keep_last_value() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);

    car.driver_torque = 80.0;
    vehicle.process_all(&car.frames(CYCLE));

    car.driver_torque = 300.0;
    for mut frame in car.frames(CYCLE * 2) {
        if frame.id == STEER_TORQUE_SENSOR {
            frame.data[7] = frame.data[7].wrapping_add(1);
        }
        vehicle.process(&frame).unwrap();
    }

    let state = vehicle.state_at(CYCLE * 2);
    assert_eq!(state.steering_torque_driver.value, 80.0);
    assert_eq!(state.steering_torque_driver.timestamp, Some(CYCLE));
    assert!(!state.steering_pressed.value);
    assert_eq!(vehicle.invalid_samples(StateField::SteeringTorqueDriver), 1);
    assert_eq!(vehicle.invalid_samples(StateField::VehicleSpeed), 0);
}

#[test]
fn counter_gap_tolerance() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();

    let angle_frame = |counter: u8, raw: u8, ms: u64| {
        Frame::new(0, STEER_ANGLE_SENSOR, &[0, 0, 0, 0, raw, 0, 0, counter])
            .unwrap()
            .with_timestamp(Duration::from_millis(ms))
    };

    vehicle.process(&angle_frame(0, 10, 0)).unwrap();
    vehicle.process(&angle_frame(1, 20, 10)).unwrap();

    // One dropped frame
    vehicle.process(&angle_frame(3, 30, 30)).unwrap();
    let state = vehicle.state_at(Duration::from_millis(30));
    assert!((state.steering_angle.value - 3.0).abs() < 1e-9);
    assert_eq!(vehicle.counter_misses(STEER_ANGLE_SENSOR), 1);

    // Two dropped frames
    vehicle.process(&angle_frame(6, 40, 60)).unwrap();
    let state = vehicle.state_at(Duration::from_millis(60));
    assert!((state.steering_angle.value - 3.0).abs() < 1e-9);
    assert_eq!(vehicle.invalid_samples(StateField::SteeringAngle), 1);

    // Back in sequence
    vehicle.process(&angle_frame(7, 50, 70)).unwrap();
    let state = vehicle.state_at(Duration::from_millis(70));
    assert!((state.steering_angle.value - 5.0).abs() < 1e-9);
}

#[test]
fn unknown_and_malformed_frames() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();

    let unknown = Frame::new(0, 0x7ff.into(), &[0; 8]).unwrap();
    assert_eq!(vehicle.process(&unknown), Err(DecodeError::UnknownMessage(0x7ff.into())));

    let short = Frame::new(0, SPEED, &[0; 4]).unwrap();
    assert_eq!(
        vehicle.process(&short),
        Err(DecodeError::LengthMismatch {
            id: SPEED,
            expected: 8,
            actual: 4
        })
    );
    assert!(vehicle.state_at(Duration::ZERO).vehicle_speed.stale);
}

#[test]
fn invalid_actuator_mapping() {
    let schema = schema();
    let mut config = config();
    config.actuators.accel_signal = "ACCEL_REQUEST".into();

    let r = VehicleInterface::new(&schema, config);
    assert!(matches!(
        r,
        Err(vehicle_interface::Error::SchemaError(SchemaError::UnknownBinding { .. }))
    ));
}

#[test]
fn reset_starts_new_session() {
    let schema = schema();
    let mut vehicle = VehicleInterface::new(&schema, config()).unwrap();
    let mut car = Car::new(&schema);
    let mut decoder = FrameDecoder::new(&schema);

    for i in 1..=3 {
        cycle(&mut vehicle, &mut car, CYCLE * i, 0.0, 0.0, true);
    }
    vehicle.reset();

    assert_eq!(vehicle.limiter_state(), LimiterState::Disabled);
    assert!(vehicle.state_at(CYCLE).vehicle_speed.stale);

    let output = vehicle.command_at(CYCLE, 0.0, 0.0, false).unwrap();
    let set = decoder.decode(&output.frames[0]).unwrap();
    assert_eq!(set.value("COUNTER"), Some(0.0));
}
