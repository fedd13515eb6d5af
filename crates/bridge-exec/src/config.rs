//! Static configuration of the bridge executor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ExecutorError, ExecutorResult};

/// Smallest accepted [`ExecutorConfig::time_for_wait_on_a`].
pub const MIN_TIME_FOR_WAIT_ON_A: Duration = Duration::from_secs(1);

/// Smallest accepted retry budget.
pub const MIN_RETRIES: u64 = 1;

/// Number of polls spread over [`ExecutorConfig::time_for_wait_on_a`] while waiting on Chain-A.
pub const WAIT_SPLITS: u32 = 10;

/// The static configuration of one bridge executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// How long to wait for a transfer to be executed on Chain-A, and for its statuses.
    pub time_for_wait_on_a: Duration,

    /// Quorum checks on Chain-A before the batch is dropped.
    pub max_quorum_retries_on_a: u64,

    /// Quorum checks on Chain-B before the batch is dropped.
    pub max_quorum_retries_on_b: u64,

    /// Status proposal checks on Chain-B before the batch is dropped.
    pub max_retries_on_was_transfer_proposed: u64,
}

impl ExecutorConfig {
    /// Fails if a duration or a retry budget is below its minimum.
    pub fn validate(&self) -> ExecutorResult<()> {
        if self.time_for_wait_on_a < MIN_TIME_FOR_WAIT_ON_A {
            return Err(ExecutorError::InvalidDuration {
                name: "time_for_wait_on_a",
                value: self.time_for_wait_on_a,
                min: MIN_TIME_FOR_WAIT_ON_A,
            });
        }

        for (name, value) in [
            ("max_quorum_retries_on_a", self.max_quorum_retries_on_a),
            ("max_quorum_retries_on_b", self.max_quorum_retries_on_b),
            (
                "max_retries_on_was_transfer_proposed",
                self.max_retries_on_was_transfer_proposed,
            ),
        ] {
            if value < MIN_RETRIES {
                return Err(ExecutorError::InvalidValue {
                    name,
                    value,
                    min: MIN_RETRIES,
                });
            }
        }

        Ok(())
    }

    /// The interval between two polls while waiting on Chain-A.
    pub fn wait_split(&self) -> Duration {
        self.time_for_wait_on_a / WAIT_SPLITS
    }
}
