//! Types for the RPC interfaces.

use bridge_relayer_primitives::{
    batch::{DepositStatus, TransferBatch},
    types::MessageHash,
};
use serde::{Deserialize, Serialize};

/// The statuses Chain-A recorded for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcBatchStatuses {
    /// One status per deposit.
    pub statuses: Vec<DepositStatus>,

    /// Whether the batch is final. Statuses of a batch that is not final must not be relayed.
    pub is_final: bool,
}

/// A batch to execute on Chain-A, with the relayer signatures authorizing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcExecuteTransfer {
    /// The hash every signature covers.
    pub message_hash: MessageHash,

    /// The batch.
    pub batch: TransferBatch,

    /// The 65-byte recoverable signatures, hex encoded.
    pub signatures: Vec<String>,
}

/// Chain-B network parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcNetworkConfig {
    /// The chain id.
    pub chain_id: String,

    /// The lowest transaction version the network accepts.
    pub min_transaction_version: u32,

    /// The lowest gas price the network accepts.
    pub min_gas_price: u64,
}

/// The execution status of a Chain-B transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcTransactionStatus {
    /// Not executed yet.
    Pending,

    /// Executed with success.
    Success,

    /// Executed with a failure.
    Fail,

    /// Unknown to the network.
    NotFound,
}
