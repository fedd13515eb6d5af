//! Configuration of the state machine runners.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::StateMachineError;

/// Default time between two consecutive steps.
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_secs(6);

/// How a state machine is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Time between two consecutive steps.
    pub step_interval: Duration,

    /// Logs how long every step took.
    #[serde(default)]
    pub profile_mode: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_interval: DEFAULT_STEP_INTERVAL,
            profile_mode: false,
        }
    }
}

impl RunnerConfig {
    /// Fails if the step interval is zero.
    pub fn validate(&self) -> Result<(), StateMachineError> {
        if self.step_interval.is_zero() {
            return Err(StateMachineError::InvalidStepInterval);
        }

        Ok(())
    }
}
