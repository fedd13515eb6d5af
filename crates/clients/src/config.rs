//! Configuration of the chain adapters and the batch validator.

use std::time::Duration;

use bridge_relayer_exec::tx_executor::TransactionChecksConfig;
use serde::{Deserialize, Serialize};

/// Chain-A gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAConfig {
    /// The JSON-RPC gateway url.
    pub network_address: String,

    /// How many availability checks in a row may observe the same block.
    pub allow_delta: u64,

    /// How often the whitelisted Chain-A relayers are refreshed.
    pub relayers_polling: Duration,
}

/// Gas limits of the Chain-B multisig calls.
///
/// The calls carrying a batch pay a base cost plus a cost per deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasLimits {
    /// Signing an action.
    pub sign: u64,

    /// Proposing a transfer, base cost.
    pub propose_transfer_base: u64,

    /// Proposing a transfer, per deposit.
    pub propose_transfer_per_deposit: u64,

    /// Proposing statuses, base cost.
    pub propose_status_base: u64,

    /// Proposing statuses, per deposit.
    pub propose_status_per_deposit: u64,

    /// Performing an action, base cost.
    pub perform_action_base: u64,

    /// Performing an action, per deposit.
    pub perform_action_per_deposit: u64,
}

impl GasLimits {
    /// Gas for proposing the transfer of `deposits` deposits.
    pub fn propose_transfer(&self, deposits: usize) -> u64 {
        self.propose_transfer_base + self.propose_transfer_per_deposit * deposits as u64
    }

    /// Gas for proposing the statuses of `deposits` deposits.
    pub fn propose_status(&self, deposits: usize) -> u64 {
        self.propose_status_base + self.propose_status_per_deposit * deposits as u64
    }

    /// Gas for performing an action over `deposits` deposits.
    pub fn perform_action(&self, deposits: usize) -> u64 {
        self.perform_action_base + self.perform_action_per_deposit * deposits as u64
    }
}

/// Chain-B gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBConfig {
    /// The JSON-RPC gateway url.
    pub network_address: String,

    /// The multisig contract transactions are sent to.
    pub multisig_address: String,

    /// How many availability checks in a row may observe the same block.
    pub allow_delta: u64,

    /// Gas limits of the multisig calls.
    pub gas_limits: GasLimits,

    /// How sent transactions are followed.
    pub transaction_checks: TransactionChecksConfig,
}

/// The external batch validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchValidatorConfig {
    /// Whether batches are validated at all.
    pub enabled: bool,

    /// The validator base url.
    pub url: String,

    /// Timeout of a validation request.
    pub request_time: Duration,
}
