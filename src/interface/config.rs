use crate::can::Identifier;
use crate::limiter::LimiterConfig;
use crate::schema::{MessageSchema, SchemaError};
use crate::state::AggregatorConfig;

const DEFAULT_BUS: u8 = 0;

/// Where the limited commands are written. Steering and acceleration may share one message, in which case a single frame carries both.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActuatorMapping {
    pub steer_message: Identifier,
    pub steer_torque_signal: String,
    pub steer_request_signal: String,
    pub accel_message: Identifier,
    pub accel_signal: String,
    pub accel_active_signal: String,
}

impl ActuatorMapping {
    fn signals(&self) -> [(Identifier, &str); 4] {
        [
            (self.steer_message, self.steer_torque_signal.as_str()),
            (self.steer_message, self.steer_request_signal.as_str()),
            (self.accel_message, self.accel_signal.as_str()),
            (self.accel_message, self.accel_active_signal.as_str()),
        ]
    }

    pub(crate) fn validate(&self, schema: &MessageSchema) -> Result<(), SchemaError> {
        for (id, signal) in self.signals() {
            let known = schema
                .lookup(id)
                .map(|message| message.signal_index(signal).is_some())
                .unwrap_or(false);

            if !known {
                return Err(SchemaError::UnknownBinding {
                    id,
                    signal: signal.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceConfig {
    /// Bus the vehicle is read from and commanded on
    pub bus: u8,
    pub aggregator: AggregatorConfig,
    pub limiter: LimiterConfig,
    pub actuators: ActuatorMapping,
}

impl InterfaceConfig {
    pub fn new(actuators: ActuatorMapping) -> Self {
        InterfaceConfig {
            bus: DEFAULT_BUS,
            aggregator: AggregatorConfig::default(),
            limiter: LimiterConfig::default(),
            actuators,
        }
    }
}
