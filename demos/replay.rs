//! Closed loop against a simulated car on the loopback bus. A background thread plays the car, the main task runs the control loop at 100 Hz and asks for a steering ramp that the limiter shapes.
use std::time::{Duration, Instant};

use vehicle_interface::can::Identifier;
use vehicle_interface::codec::FrameEncoder;
use vehicle_interface::interface::{ActuatorMapping, InterfaceConfig, VehicleInterface};
use vehicle_interface::loopback::LoopbackAdapter;
use vehicle_interface::schema::{MessageDefinition, MessageSchema, SignalDefinition};
use vehicle_interface::state::StateField;
use vehicle_interface::StreamExt;

const SPEED: Identifier = Identifier::Standard(0xb4);
const STEER_TORQUE_SENSOR: Identifier = Identifier::Standard(0x260);
const STEERING_LKA: Identifier = Identifier::Standard(0x2e4);
const ACC_CONTROL: Identifier = Identifier::Standard(0x343);

fn schema() -> MessageSchema {
    let fast = Duration::from_millis(10);
    let slow = Duration::from_millis(20);

    let messages = vec![
        MessageDefinition::new(SPEED, "SPEED", 8, slow)
            .signal(
                SignalDefinition::new("SPEED", 40, 16)
                    .big_endian()
                    .scale(0.01, 0.0)
                    .unit("kph"),
            ),
        MessageDefinition::new(STEER_TORQUE_SENSOR, "STEER_TORQUE_SENSOR", 8, slow)
            .signal(SignalDefinition::new("STEER_TORQUE_DRIVER", 8, 16).big_endian().signed()),
        MessageDefinition::new(STEERING_LKA, "STEERING_LKA", 5, fast)
            .signal(SignalDefinition::new("STEER_REQUEST", 0, 1))
            .signal(SignalDefinition::new("COUNTER", 1, 6).big_endian())
            .signal(SignalDefinition::new("STEER_TORQUE_CMD", 8, 16).big_endian().signed())
            .counter("COUNTER"),
        MessageDefinition::new(ACC_CONTROL, "ACC_CONTROL", 8, slow)
            .signal(
                SignalDefinition::new("ACCEL_CMD", 0, 16)
                    .big_endian()
                    .signed()
                    .scale(0.001, 0.0),
            )
            .signal(SignalDefinition::new("ACC_ACTIVE", 16, 1)),
    ];

    MessageSchema::new(1, messages).unwrap()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let schema = schema();
    let actuators = ActuatorMapping {
        steer_message: STEERING_LKA,
        steer_torque_signal: "STEER_TORQUE_CMD".into(),
        steer_request_signal: "STEER_REQUEST".into(),
        accel_message: ACC_CONTROL,
        accel_signal: "ACCEL_CMD".into(),
        accel_active_signal: "ACC_ACTIVE".into(),
    };
    let mut config = InterfaceConfig::new(actuators);
    config.aggregator = config
        .aggregator
        .bind(StateField::VehicleSpeed, SPEED, "SPEED")
        .bind(StateField::SteeringTorqueDriver, STEER_TORQUE_SENSOR, "STEER_TORQUE_DRIVER");

    let mut vehicle = VehicleInterface::new(&schema, config).unwrap();
    let (adapter, injector) = LoopbackAdapter::new_async();
    let start = Instant::now();

    // Simulated car, sends its sensors every 20 ms for two seconds
    let car_schema = schema.clone();
    std::thread::spawn(move || {
        let mut encoder = FrameEncoder::new(&car_schema);
        for _ in 0..100 {
            let now = start.elapsed();
            let frames = [
                encoder.encode(SPEED, &[("SPEED", 72.5)]),
                encoder.encode(STEER_TORQUE_SENSOR, &[("STEER_TORQUE_DRIVER", 12.0)]),
            ];
            for frame in frames {
                if injector.send(frame.unwrap().with_timestamp(now)).is_err() {
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    });

    let stream = adapter.recv();
    tokio::pin!(stream);
    let mut interval = tokio::time::interval(Duration::from_millis(10));

    for cycle in 0..300u32 {
        tokio::select! {
            Some(frame) = stream.next() => {
                let _ = vehicle.process(&frame);
            }
            _ = interval.tick() => {
                let now = start.elapsed();
                let target = if cycle < 150 { 600.0 } else { -600.0 };
                let output = vehicle.command_at(now, target, 0.5, true).unwrap();

                for frame in &output.frames {
                    if let Err(e) = adapter.try_send(frame) {
                        println!("TX dropped: {}", e);
                    }
                }

                let r = output.result;
                println!(
                    "[{:>5} ms] {:<12} torque {:>7.1} active {:<5} accel {:>5.2} fault {:?} {}",
                    now.as_millis(),
                    r.state.to_string(),
                    r.steer_torque,
                    r.steer_active,
                    r.accel,
                    r.fault,
                    hex::encode(&output.frames[0].data),
                );
            }
        }
    }
}
