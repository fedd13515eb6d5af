//! Chain-B through the JSON-RPC gateway.
//!
//! Views are plain gateway calls. Every mutation of the multisig is a transaction sent through
//! the [`TransactionExecutor`], with the call encoded as `function@arg@arg...`, each argument
//! hex encoded.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_relayer_exec::{
    errors::ClientError,
    traits::{ChainBClient, ClientResult},
    tx_executor::TransactionExecutor,
};
use bridge_relayer_primitives::{
    batch::TransferBatch,
    types::{ActionId, RelayerPubKey},
};
use bridge_relayer_rpc::ChainBGatewayApiClient;
use jsonrpsee::http_client::HttpClient;
use primitive_types::U256;
use tokio_util::sync::CancellationToken;

use crate::{
    availability::AvailabilityTracker, call, config::GasLimits, role_providers::RelayersFetcher,
};

const PROPOSE_TRANSFER_FUNCTION: &str = "proposeMultiTransferEsdtBatch";
const PROPOSE_SET_STATUS_FUNCTION: &str = "proposeEsdtSafeSetCurrentTransactionBatchStatus";
const SIGN_FUNCTION: &str = "sign";
const PERFORM_ACTION_FUNCTION: &str = "performAction";

/// Encodes a contract call as `function@hex(arg)@hex(arg)...`.
pub fn encode_call(function: &str, args: &[Vec<u8>]) -> Vec<u8> {
    let mut data = function.to_string();
    for arg in args {
        data.push('@');
        data.push_str(&hex::encode(arg));
    }

    data.into_bytes()
}

/// The minimal big-endian encoding of `value`, empty for zero.
fn big_endian(value: U256) -> Vec<u8> {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

fn u64_arg(value: u64) -> Vec<u8> {
    big_endian(U256::from(value))
}

/// Arguments of a transfer proposal: the batch id, then the recipient, token, amount and nonce of
/// every deposit.
fn transfer_args(batch: &TransferBatch) -> Vec<Vec<u8>> {
    let mut args = vec![u64_arg(batch.id)];
    for deposit in &batch.deposits {
        args.push(deposit.to_bytes.clone());
        args.push(deposit.converted_token_bytes.clone());
        args.push(big_endian(deposit.amount));
        args.push(u64_arg(deposit.nonce));
    }

    args
}

/// Arguments of a statuses proposal: the batch id, then one status byte per deposit.
fn set_status_args(batch: &TransferBatch) -> Vec<Vec<u8>> {
    let mut args = vec![u64_arg(batch.id)];
    args.extend(batch.statuses.iter().map(|status| vec![*status as u8]));
    args
}

/// [`ChainBClient`] backed by the gateway's `chainB` namespace.
#[derive(Debug)]
pub struct JsonRpcChainBClient {
    client: HttpClient,
    executor: Arc<TransactionExecutor>,
    multisig_address: String,
    relayer_address: String,
    gas_limits: GasLimits,
    availability: AvailabilityTracker,
}

/// Arguments for [`JsonRpcChainBClient::new`].
#[derive(Debug)]
pub struct ChainBClientArgs {
    /// The gateway connection.
    pub client: HttpClient,

    /// Sends the multisig transactions.
    pub executor: Arc<TransactionExecutor>,

    /// The multisig contract.
    pub multisig_address: String,

    /// This relayer's Chain-B address.
    pub relayer_address: String,

    /// Gas limits of the multisig calls.
    pub gas_limits: GasLimits,

    /// Block progress tracking.
    pub availability: AvailabilityTracker,
}

impl JsonRpcChainBClient {
    /// Creates the client.
    pub fn new(args: ChainBClientArgs) -> Self {
        Self {
            client: args.client,
            executor: args.executor,
            multisig_address: args.multisig_address,
            relayer_address: args.relayer_address,
            gas_limits: args.gas_limits,
            availability: args.availability,
        }
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        function: &str,
        args: &[Vec<u8>],
        gas_limit: u64,
    ) -> ClientResult<String> {
        self.executor
            .execute_transaction(
                cancel,
                &self.multisig_address,
                function,
                gas_limit,
                encode_call(function, args),
            )
            .await
    }
}

#[async_trait]
impl ChainBClient for JsonRpcChainBClient {
    async fn get_pending_batch(
        &self,
        cancel: &CancellationToken,
    ) -> ClientResult<Option<TransferBatch>> {
        call(cancel, "getCurrentTxBatch", self.client.get_current_tx_batch()).await
    }

    async fn get_last_executed_a_batch_id(&self, cancel: &CancellationToken) -> ClientResult<u64> {
        call(
            cancel,
            "getLastExecutedEthBatchId",
            self.client.get_last_executed_eth_batch_id(),
        )
        .await
    }

    async fn get_last_a_deposit_nonce(&self, cancel: &CancellationToken) -> ClientResult<u64> {
        call(
            cancel,
            "getLastExecutedEthTxId",
            self.client.get_last_executed_eth_tx_id(),
        )
        .await
    }

    async fn get_action_id_for_propose_transfer(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<ActionId> {
        call(
            cancel,
            "getActionIdForProposeTransfer",
            self.client.get_action_id_for_propose_transfer(batch.clone()),
        )
        .await
    }

    async fn get_action_id_for_set_status(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<ActionId> {
        call(
            cancel,
            "getActionIdForSetStatusOnPendingTransfer",
            self.client
                .get_action_id_for_set_status_on_pending_transfer(batch.clone()),
        )
        .await
    }

    async fn was_proposed_transfer(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<bool> {
        call(
            cancel,
            "wasProposedTransfer",
            self.client.was_proposed_transfer(batch.clone()),
        )
        .await
    }

    async fn was_proposed_set_status(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<bool> {
        call(
            cancel,
            "wasProposedSetStatus",
            self.client.was_proposed_set_status(batch.clone()),
        )
        .await
    }

    async fn was_signed(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ClientResult<bool> {
        call(
            cancel,
            "wasSigned",
            self.client.was_signed(action_id, self.relayer_address.clone()),
        )
        .await
    }

    async fn was_executed(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ClientResult<bool> {
        call(cancel, "wasExecuted", ChainBGatewayApiClient::was_executed(&self.client, action_id))
            .await
    }

    async fn quorum_reached(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ClientResult<bool> {
        call(cancel, "quorumReached", self.client.quorum_reached(action_id)).await
    }

    async fn propose_transfer(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<String> {
        let gas_limit = self.gas_limits.propose_transfer(batch.deposits.len());
        self.send(cancel, PROPOSE_TRANSFER_FUNCTION, &transfer_args(batch), gas_limit)
            .await
    }

    async fn propose_set_status(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<String> {
        let gas_limit = self.gas_limits.propose_status(batch.deposits.len());
        self.send(cancel, PROPOSE_SET_STATUS_FUNCTION, &set_status_args(batch), gas_limit)
            .await
    }

    async fn sign(&self, cancel: &CancellationToken, action_id: ActionId) -> ClientResult<String> {
        self.send(cancel, SIGN_FUNCTION, &[u64_arg(action_id)], self.gas_limits.sign)
            .await
    }

    async fn perform_action(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
        batch: &TransferBatch,
    ) -> ClientResult<String> {
        let gas_limit = self.gas_limits.perform_action(batch.deposits.len());
        self.send(cancel, PERFORM_ACTION_FUNCTION, &[u64_arg(action_id)], gas_limit)
            .await
    }

    async fn check_client_availability(&self, cancel: &CancellationToken) -> ClientResult<()> {
        let block = call(cancel, "blockNonce", self.client.block_nonce()).await?;
        self.availability.observe(U256::from(block)).await
    }

    async fn check_required_balance(
        &self,
        cancel: &CancellationToken,
        token: &[u8],
        amount: U256,
    ) -> ClientResult<()> {
        let token = hex::encode(token);
        let available = call(
            cancel,
            "tokenBalance",
            ChainBGatewayApiClient::token_balance(&self.client, token.clone()),
        )
        .await?;
        if available < amount {
            return Err(ClientError::InsufficientBalance {
                token,
                required: amount,
                available,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RelayersFetcher<RelayerPubKey> for JsonRpcChainBClient {
    async fn fetch_relayers(&self, cancel: &CancellationToken) -> ClientResult<Vec<RelayerPubKey>> {
        call(
            cancel,
            "getAllStakedRelayers",
            self.client.get_all_staked_relayers(),
        )
        .await
    }
}
