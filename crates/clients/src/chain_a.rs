//! Chain-A through the JSON-RPC gateway.

use std::fmt;

use async_trait::async_trait;
use bridge_relayer_exec::{
    errors::ClientError,
    traits::{ChainAClient, ClientResult},
};
use bridge_relayer_primitives::{
    batch::{DepositStatus, TransferBatch},
    eth::{address_from_public_key, sign_hash},
    types::{EthAddress, MessageHash},
};
use bridge_relayer_rpc::{types::RpcExecuteTransfer, ChainAGatewayApiClient};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use primitive_types::U256;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{availability::AvailabilityTracker, call, role_providers::RelayersFetcher};

/// [`ChainAClient`] backed by the gateway's `chainA` namespace.
pub struct JsonRpcChainAClient {
    client: HttpClient,
    secret_key: SecretKey,
    address: EthAddress,
    availability: AvailabilityTracker,
}

impl fmt::Debug for JsonRpcChainAClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcChainAClient")
            .field("address", &self.address)
            .field("availability", &self.availability)
            .finish_non_exhaustive()
    }
}

impl JsonRpcChainAClient {
    /// Creates the client over an existing connection. Batches are signed with `secret_key`.
    pub fn new(client: HttpClient, secret_key: SecretKey, availability: AvailabilityTracker) -> Self {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        Self {
            client,
            secret_key,
            address: address_from_public_key(&public_key),
            availability,
        }
    }

    /// Connects to the gateway at `url`.
    pub fn connect(
        url: &str,
        secret_key: SecretKey,
        availability: AvailabilityTracker,
    ) -> ClientResult<Self> {
        let client = HttpClientBuilder::default()
            .build(url)
            .map_err(|e| ClientError::Rpc(format!("{url}: {e}")))?;

        Ok(Self::new(client, secret_key, availability))
    }

    /// This relayer's Chain-A address.
    pub const fn address(&self) -> EthAddress {
        self.address
    }
}

#[async_trait]
impl ChainAClient for JsonRpcChainAClient {
    async fn get_batch(
        &self,
        cancel: &CancellationToken,
        nonce: u64,
    ) -> ClientResult<Option<TransferBatch>> {
        call(cancel, "getBatch", self.client.get_batch(nonce)).await
    }

    async fn was_executed(&self, cancel: &CancellationToken, batch_id: u64) -> ClientResult<bool> {
        call(cancel, "wasBatchExecuted", self.client.was_batch_executed(batch_id)).await
    }

    fn sign_message_hash(&self, message_hash: &MessageHash) -> ClientResult<Vec<u8>> {
        Ok(sign_hash(&self.secret_key, message_hash).to_vec())
    }

    async fn execute_transfer(
        &self,
        cancel: &CancellationToken,
        message_hash: &MessageHash,
        batch: &TransferBatch,
        signatures: Vec<Vec<u8>>,
    ) -> ClientResult<String> {
        let transfer = RpcExecuteTransfer {
            message_hash: *message_hash,
            batch: batch.clone(),
            signatures: signatures.iter().map(hex::encode).collect(),
        };

        call(cancel, "executeTransfer", self.client.execute_transfer(transfer)).await
    }

    async fn quorum(&self, cancel: &CancellationToken) -> ClientResult<u64> {
        call(cancel, "quorum", self.client.quorum()).await
    }

    async fn get_transactions_statuses(
        &self,
        cancel: &CancellationToken,
        batch_id: u64,
    ) -> ClientResult<Vec<DepositStatus>> {
        let statuses = call(
            cancel,
            "getStatusesAfterExecution",
            self.client.get_statuses_after_execution(batch_id),
        )
        .await?;

        if !statuses.is_final {
            debug!(%batch_id, "statuses are not final yet");
            return Ok(Vec::new());
        }

        Ok(statuses.statuses)
    }

    async fn check_client_availability(&self, cancel: &CancellationToken) -> ClientResult<()> {
        let block = call(cancel, "blockNumber", self.client.block_number()).await?;
        self.availability.observe(U256::from(block)).await
    }

    async fn check_required_balance(
        &self,
        cancel: &CancellationToken,
        token: &[u8],
        amount: U256,
    ) -> ClientResult<()> {
        let token = hex::encode(token);
        let available = call(cancel, "tokenBalance", self.client.token_balance(token.clone())).await?;
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
impl RelayersFetcher<EthAddress> for JsonRpcChainAClient {
    async fn fetch_relayers(&self, cancel: &CancellationToken) -> ClientResult<Vec<EthAddress>> {
        call(cancel, "getRelayers", self.client.get_relayers()).await
    }
}
