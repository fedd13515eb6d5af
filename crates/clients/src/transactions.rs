//! Chain-B transaction plumbing for the [`TransactionExecutor`].
//!
//! [`TransactionExecutor`]: bridge_relayer_exec::tx_executor::TransactionExecutor

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bridge_relayer_exec::{
    errors::ClientError,
    traits::ClientResult,
    tx_executor::{NetworkConfig, NonceTransactionsHandler, Transaction, TxProxy, TxSigner, TxStatus},
};
use bridge_relayer_p2p_service::RelayerKeypair;
use bridge_relayer_rpc::{types::RpcTransactionStatus, ChainBGatewayApiClient};
use jsonrpsee::http_client::HttpClient;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::call;

/// Reads the network and sends transactions through the Chain-B gateway.
///
/// Nonces are the larger of the account nonce the gateway reports and the last nonce handed out
/// plus one, so several transactions can be sent before the first one is included.
#[derive(Debug)]
pub struct GatewayTransactions {
    client: HttpClient,
    last_nonces: Mutex<HashMap<String, u64>>,
}

impl GatewayTransactions {
    /// Creates the handler over a gateway connection.
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            last_nonces: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl NonceTransactionsHandler for GatewayTransactions {
    async fn apply_nonce_and_gas_price(
        &self,
        cancel: &CancellationToken,
        sender: &str,
        tx: &mut Transaction,
    ) -> ClientResult<()> {
        let remote = call(
            cancel,
            "accountNonce",
            self.client.account_nonce(sender.to_string()),
        )
        .await?;
        let network = call(cancel, "networkConfig", self.client.network_config()).await?;

        let mut last_nonces = self.last_nonces.lock();
        let nonce = match last_nonces.get(sender) {
            Some(last) => remote.max(last + 1),
            None => remote,
        };
        last_nonces.insert(sender.to_string(), nonce);

        tx.nonce = nonce;
        tx.gas_price = network.min_gas_price;
        Ok(())
    }

    async fn send_transaction(
        &self,
        cancel: &CancellationToken,
        tx: &Transaction,
    ) -> ClientResult<String> {
        let payload =
            serde_json::to_value(tx).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let result = call(cancel, "sendTransaction", self.client.send_transaction(payload)).await;
        if let Err(e) = &result {
            // resync with the account nonce on the next transaction
            warn!(sender = %tx.sender, nonce = tx.nonce, %e, "transaction not accepted");
            self.last_nonces.lock().remove(&tx.sender);
        }

        result
    }
}

#[async_trait]
impl TxProxy for GatewayTransactions {
    async fn network_config(&self, cancel: &CancellationToken) -> ClientResult<NetworkConfig> {
        let network = call(cancel, "networkConfig", self.client.network_config()).await?;
        Ok(NetworkConfig {
            chain_id: network.chain_id,
            min_transaction_version: network.min_transaction_version,
        })
    }

    async fn process_transaction_status(
        &self,
        cancel: &CancellationToken,
        hash: &str,
    ) -> ClientResult<TxStatus> {
        let status = call(
            cancel,
            "transactionStatus",
            self.client.transaction_status(hash.to_string()),
        )
        .await?;
        debug!(%hash, ?status, "fetched transaction status");

        Ok(match status {
            RpcTransactionStatus::Pending => TxStatus::Pending,
            RpcTransactionStatus::Success => TxStatus::Success,
            RpcTransactionStatus::Fail => TxStatus::Fail,
            RpcTransactionStatus::NotFound => TxStatus::NotFound,
        })
    }

    async fn get_transaction(
        &self,
        cancel: &CancellationToken,
        hash: &str,
    ) -> ClientResult<serde_json::Value> {
        call(
            cancel,
            "transactionInfo",
            self.client.transaction_info(hash.to_string()),
        )
        .await
    }
}

/// Signs Chain-B transactions with the relayer key.
///
/// The sender address is the hex encoded compressed public key, the form the staking contract
/// lists relayers in.
#[derive(Debug, Clone)]
pub struct KeypairTxSigner {
    keypair: Arc<RelayerKeypair>,
}

impl KeypairTxSigner {
    /// Creates the signer.
    pub const fn new(keypair: Arc<RelayerKeypair>) -> Self {
        Self { keypair }
    }
}

impl TxSigner for KeypairTxSigner {
    fn address(&self) -> String {
        self.keypair.relayer_pubkey().to_string()
    }

    fn sign(&self, payload: &[u8]) -> ClientResult<Vec<u8>> {
        Ok(self.keypair.sign(payload))
    }
}
