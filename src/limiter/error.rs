//! Faults that latch the command limiter.

use thiserror::Error;

use crate::state::StateField;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LimiterFault {
    #[error("Requested torque deviates from the rate limited trajectory")]
    RateViolation,
    #[error("Request outside the valid range")]
    RangeViolation,
    #[error("Required field {0} is stale")]
    StaleInput(StateField),
    #[error("Missed {0} consecutive control cycles")]
    MissedDeadlines(u32),
}
