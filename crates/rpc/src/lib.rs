//! Provides the JSON-RPC interfaces of the relayer.
//!
//! The relayer reaches both chains through a gateway exposing their contract views and
//! transaction endpoints as JSON-RPC methods, one namespace per chain. It also serves its own
//! status metrics. Enable the `client` feature to get the generated clients.

pub mod types;

use bridge_relayer_common::status::GeneralMetrics;
use bridge_relayer_primitives::{
    batch::TransferBatch,
    types::{ActionId, EthAddress, RelayerPubKey},
};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use primitive_types::U256;

use crate::types::*;

/// The Chain-A bridge contract, as exposed by the gateway.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "chainA"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "chainA"))]
pub trait ChainAGatewayApi {
    /// Get the batch with the given id, if the contract knows it.
    #[method(name = "getBatch")]
    async fn get_batch(&self, batch_id: u64) -> RpcResult<Option<TransferBatch>>;

    /// Get the addresses of the whitelisted relayers.
    #[method(name = "getRelayers")]
    async fn get_relayers(&self) -> RpcResult<Vec<EthAddress>>;

    /// Whether the batch was executed.
    #[method(name = "wasBatchExecuted")]
    async fn was_batch_executed(&self, batch_id: u64) -> RpcResult<bool>;

    /// Get the deposit statuses recorded when the batch was executed.
    #[method(name = "getStatusesAfterExecution")]
    async fn get_statuses_after_execution(&self, batch_id: u64) -> RpcResult<RpcBatchStatuses>;

    /// Submit a batch with its signatures. Returns the transaction hash.
    #[method(name = "executeTransfer")]
    async fn execute_transfer(&self, transfer: RpcExecuteTransfer) -> RpcResult<String>;

    /// Get the number of signatures a batch needs.
    #[method(name = "quorum")]
    async fn quorum(&self) -> RpcResult<u64>;

    /// Get the current block number.
    #[method(name = "blockNumber")]
    async fn block_number(&self) -> RpcResult<u64>;

    /// Get the bridge balance of a token, given as hex.
    #[method(name = "tokenBalance")]
    async fn token_balance(&self, token: String) -> RpcResult<U256>;
}

/// The Chain-B multisig and network, as exposed by the gateway.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "chainB"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "chainB"))]
pub trait ChainBGatewayApi {
    /// Get the batch waiting to be relayed to Chain-A.
    #[method(name = "getCurrentTxBatch")]
    async fn get_current_tx_batch(&self) -> RpcResult<Option<TransferBatch>>;

    /// Get the id of the last Chain-A batch executed.
    #[method(name = "getLastExecutedEthBatchId")]
    async fn get_last_executed_eth_batch_id(&self) -> RpcResult<u64>;

    /// Get the nonce of the last Chain-A deposit executed.
    #[method(name = "getLastExecutedEthTxId")]
    async fn get_last_executed_eth_tx_id(&self) -> RpcResult<u64>;

    /// Get the action proposing the transfer of a batch.
    #[method(name = "getActionIdForProposeTransfer")]
    async fn get_action_id_for_propose_transfer(&self, batch: TransferBatch)
        -> RpcResult<ActionId>;

    /// Get the action proposing the statuses of a batch.
    #[method(name = "getActionIdForSetStatusOnPendingTransfer")]
    async fn get_action_id_for_set_status_on_pending_transfer(
        &self,
        batch: TransferBatch,
    ) -> RpcResult<ActionId>;

    /// Whether the transfer of a batch was proposed.
    #[method(name = "wasProposedTransfer")]
    async fn was_proposed_transfer(&self, batch: TransferBatch) -> RpcResult<bool>;

    /// Whether the statuses of a batch were proposed.
    #[method(name = "wasProposedSetStatus")]
    async fn was_proposed_set_status(&self, batch: TransferBatch) -> RpcResult<bool>;

    /// Whether `signer` signed the action.
    #[method(name = "wasSigned")]
    async fn was_signed(&self, action_id: ActionId, signer: String) -> RpcResult<bool>;

    /// Whether the action was executed.
    #[method(name = "wasExecuted")]
    async fn was_executed(&self, action_id: ActionId) -> RpcResult<bool>;

    /// Whether the action gathered enough signatures.
    #[method(name = "quorumReached")]
    async fn quorum_reached(&self, action_id: ActionId) -> RpcResult<bool>;

    /// Get the keys of the staked relayers.
    #[method(name = "getAllStakedRelayers")]
    async fn get_all_staked_relayers(&self) -> RpcResult<Vec<RelayerPubKey>>;

    /// Get the bridge balance of a token, given as hex.
    #[method(name = "tokenBalance")]
    async fn token_balance(&self, token: String) -> RpcResult<U256>;

    /// Get the current network parameters.
    #[method(name = "networkConfig")]
    async fn network_config(&self) -> RpcResult<RpcNetworkConfig>;

    /// Get the next nonce of an account.
    #[method(name = "accountNonce")]
    async fn account_nonce(&self, address: String) -> RpcResult<u64>;

    /// Get the current block nonce.
    #[method(name = "blockNonce")]
    async fn block_nonce(&self) -> RpcResult<u64>;

    /// Send a signed transaction, in its JSON form. Returns its hash.
    #[method(name = "sendTransaction")]
    async fn send_transaction(&self, tx: serde_json::Value) -> RpcResult<String>;

    /// Get the execution status of a transaction.
    #[method(name = "transactionStatus")]
    async fn transaction_status(&self, hash: String) -> RpcResult<RpcTransactionStatus>;

    /// Get a transaction with its results.
    #[method(name = "transactionInfo")]
    async fn transaction_info(&self, hash: String) -> RpcResult<serde_json::Value>;
}

/// The relayer's own status.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "relayer"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "relayer"))]
pub trait RelayerStatusApi {
    /// Get the names of the status handlers, sorted.
    #[method(name = "statusHandlers")]
    async fn status_handlers(&self) -> RpcResult<Vec<String>>;

    /// Get every metric of a status handler.
    #[method(name = "metrics")]
    async fn metrics(&self, name: String) -> RpcResult<GeneralMetrics>;
}
