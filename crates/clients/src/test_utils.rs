//! An in-memory gateway serving both chain namespaces over HTTP.

#![allow(unreachable_pub)]

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use bridge_relayer_exec::tx_executor::{
    TransactionChecksConfig, TransactionExecutor, TransactionExecutorArgs, TxSigner,
};
use bridge_relayer_p2p_service::RelayerKeypair;
use bridge_relayer_primitives::{
    batch::{DepositStatus, DepositTransfer, TransferBatch},
    types::{ActionId, EthAddress, RelayerPubKey},
};
use bridge_relayer_rpc::{
    types::{RpcBatchStatuses, RpcExecuteTransfer, RpcNetworkConfig, RpcTransactionStatus},
    ChainAGatewayApiServer, ChainBGatewayApiServer,
};
use jsonrpsee::{
    core::RpcResult,
    http_client::{HttpClient, HttpClientBuilder},
    server::{ServerBuilder, ServerHandle},
    types::ErrorObjectOwned,
    RpcModule,
};
use parking_lot::Mutex;
use primitive_types::U256;
use tokio_util::sync::CancellationToken;

use crate::{
    availability::AvailabilityTracker,
    chain_b::{ChainBClientArgs, JsonRpcChainBClient},
    config::GasLimits,
    transactions::{GatewayTransactions, KeypairTxSigner},
};

/// A batch with one 100-unit deposit of the same token per nonce.
pub fn batch(id: u64, nonces: &[u64]) -> TransferBatch {
    let deposits = nonces
        .iter()
        .map(|nonce| DepositTransfer {
            nonce: *nonce,
            to_bytes: vec![0x0a; 20],
            displayable_to: "to".to_string(),
            from_bytes: vec![0x0b; 32],
            displayable_from: "from".to_string(),
            token_bytes: b"tkn".to_vec(),
            converted_token_bytes: b"TKN-123".to_vec(),
            displayable_token: "tkn".to_string(),
            amount: U256::from(100),
        })
        .collect();

    TransferBatch::new(id, deposits)
}

/// What the gateway knows and what it received.
#[derive(Debug, Default)]
pub struct GatewayState {
    pub a_batches: Mutex<HashMap<u64, TransferBatch>>,
    pub a_executed: Mutex<HashSet<u64>>,
    pub executed_transfers: Mutex<Vec<RpcExecuteTransfer>>,
    pub a_statuses: Mutex<HashMap<u64, (Vec<DepositStatus>, bool)>>,
    pub relayers: Mutex<Vec<EthAddress>>,
    pub balances: Mutex<HashMap<String, U256>>,
    pub block: Mutex<u64>,

    pub b_pending: Mutex<Option<TransferBatch>>,
    pub last_executed_a_batch_id: Mutex<u64>,
    pub signed_by: Mutex<Vec<(ActionId, String)>>,
    pub staked: Mutex<Vec<RelayerPubKey>>,
    pub account_nonce: Mutex<u64>,
    pub sent_transactions: Mutex<Vec<serde_json::Value>>,
    pub reject_transactions: Mutex<bool>,
    pub tx_statuses: Mutex<HashMap<String, RpcTransactionStatus>>,
}

#[derive(Debug, Clone)]
struct FakeGateway(Arc<GatewayState>);

fn rejected() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32000, "rejected", None::<()>)
}

#[async_trait]
impl ChainAGatewayApiServer for FakeGateway {
    async fn get_batch(&self, batch_id: u64) -> RpcResult<Option<TransferBatch>> {
        Ok(self.0.a_batches.lock().get(&batch_id).cloned())
    }

    async fn get_relayers(&self) -> RpcResult<Vec<EthAddress>> {
        Ok(self.0.relayers.lock().clone())
    }

    async fn was_batch_executed(&self, batch_id: u64) -> RpcResult<bool> {
        Ok(self.0.a_executed.lock().contains(&batch_id))
    }

    async fn get_statuses_after_execution(&self, batch_id: u64) -> RpcResult<RpcBatchStatuses> {
        let (statuses, is_final) = self
            .0
            .a_statuses
            .lock()
            .get(&batch_id)
            .cloned()
            .unwrap_or_default();

        Ok(RpcBatchStatuses { statuses, is_final })
    }

    async fn execute_transfer(&self, transfer: RpcExecuteTransfer) -> RpcResult<String> {
        let id = transfer.batch.id;
        self.0.a_executed.lock().insert(id);
        self.0.executed_transfers.lock().push(transfer);
        Ok(format!("0xexecuted{id}"))
    }

    async fn quorum(&self) -> RpcResult<u64> {
        Ok(1)
    }

    async fn block_number(&self) -> RpcResult<u64> {
        Ok(*self.0.block.lock())
    }

    async fn token_balance(&self, token: String) -> RpcResult<U256> {
        Ok(self.0.balances.lock().get(&token).copied().unwrap_or_default())
    }
}

#[async_trait]
impl ChainBGatewayApiServer for FakeGateway {
    async fn get_current_tx_batch(&self) -> RpcResult<Option<TransferBatch>> {
        Ok(self.0.b_pending.lock().clone())
    }

    async fn get_last_executed_eth_batch_id(&self) -> RpcResult<u64> {
        Ok(*self.0.last_executed_a_batch_id.lock())
    }

    async fn get_last_executed_eth_tx_id(&self) -> RpcResult<u64> {
        Ok(0)
    }

    async fn get_action_id_for_propose_transfer(&self, batch: TransferBatch) -> RpcResult<ActionId> {
        Ok(batch.id * 10)
    }

    async fn get_action_id_for_set_status_on_pending_transfer(
        &self,
        batch: TransferBatch,
    ) -> RpcResult<ActionId> {
        Ok(batch.id * 10 + 1)
    }

    async fn was_proposed_transfer(&self, _batch: TransferBatch) -> RpcResult<bool> {
        Ok(false)
    }

    async fn was_proposed_set_status(&self, _batch: TransferBatch) -> RpcResult<bool> {
        Ok(false)
    }

    async fn was_signed(&self, action_id: ActionId, signer: String) -> RpcResult<bool> {
        Ok(self.0.signed_by.lock().contains(&(action_id, signer)))
    }

    async fn was_executed(&self, _action_id: ActionId) -> RpcResult<bool> {
        Ok(false)
    }

    async fn quorum_reached(&self, _action_id: ActionId) -> RpcResult<bool> {
        Ok(false)
    }

    async fn get_all_staked_relayers(&self) -> RpcResult<Vec<RelayerPubKey>> {
        Ok(self.0.staked.lock().clone())
    }

    async fn token_balance(&self, token: String) -> RpcResult<U256> {
        Ok(self.0.balances.lock().get(&token).copied().unwrap_or_default())
    }

    async fn network_config(&self) -> RpcResult<RpcNetworkConfig> {
        Ok(RpcNetworkConfig {
            chain_id: "T".to_string(),
            min_transaction_version: 1,
            min_gas_price: 1_000_000_000,
        })
    }

    async fn account_nonce(&self, _address: String) -> RpcResult<u64> {
        Ok(*self.0.account_nonce.lock())
    }

    async fn block_nonce(&self) -> RpcResult<u64> {
        Ok(*self.0.block.lock())
    }

    async fn send_transaction(&self, tx: serde_json::Value) -> RpcResult<String> {
        if *self.0.reject_transactions.lock() {
            return Err(rejected());
        }

        let nonce = tx["nonce"].as_u64().unwrap_or_default();
        *self.0.account_nonce.lock() = nonce + 1;

        let mut sent = self.0.sent_transactions.lock();
        sent.push(tx);
        Ok(format!("0xtx{}", sent.len()))
    }

    async fn transaction_status(&self, hash: String) -> RpcResult<RpcTransactionStatus> {
        Ok(self
            .0
            .tx_statuses
            .lock()
            .get(&hash)
            .copied()
            .unwrap_or(RpcTransactionStatus::NotFound))
    }

    async fn transaction_info(&self, hash: String) -> RpcResult<serde_json::Value> {
        Ok(serde_json::json!({ "hash": hash }))
    }
}

/// A running gateway.
#[derive(Debug)]
pub struct Gateway {
    pub url: String,
    pub state: Arc<GatewayState>,
    _handle: ServerHandle,
}

impl Gateway {
    /// A fresh connection to the gateway.
    pub fn client(&self) -> HttpClient {
        HttpClientBuilder::default().build(&self.url).unwrap()
    }
}

/// Starts a gateway on a random local port.
pub async fn start_gateway() -> Gateway {
    let state = Arc::new(GatewayState::default());
    let gateway = FakeGateway(state.clone());

    let mut module = RpcModule::new(());
    module
        .merge(ChainAGatewayApiServer::into_rpc(gateway.clone()))
        .unwrap();
    module
        .merge(ChainBGatewayApiServer::into_rpc(gateway))
        .unwrap();

    let server = ServerBuilder::default().build("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", server.local_addr().unwrap());
    let handle = server.start(module);

    Gateway {
        url,
        state,
        _handle: handle,
    }
}

/// A Chain-B client sending to `multisig` without following the transactions.
pub fn chain_b_client(gateway: &Gateway) -> JsonRpcChainBClient {
    let transactions = Arc::new(GatewayTransactions::new(gateway.client()));
    let signer = Arc::new(KeypairTxSigner::new(Arc::new(RelayerKeypair::generate())));
    let relayer_address = signer.address();

    let executor = TransactionExecutor::new(TransactionExecutorArgs {
        proxy: transactions.clone(),
        nonce_handler: transactions,
        signer,
        checks: TransactionChecksConfig {
            check_transaction_results: false,
            time_between_checks: Duration::from_millis(10),
            execution_timeout: Duration::from_secs(1),
            close_app_on_error: false,
            extra_delay_on_error: Duration::from_millis(10),
        },
        shutdown: CancellationToken::new(),
        status_handler: None,
    })
    .unwrap();

    JsonRpcChainBClient::new(ChainBClientArgs {
        client: gateway.client(),
        executor: Arc::new(executor),
        multisig_address: "multisig".to_string(),
        relayer_address,
        gas_limits: GasLimits {
            sign: 500,
            propose_transfer_base: 1_000,
            propose_transfer_per_deposit: 100,
            propose_status_base: 800,
            propose_status_per_deposit: 50,
            perform_action_base: 2_000,
            perform_action_per_deposit: 200,
        },
        availability: AvailabilityTracker::new("chain-b", 1),
    })
}
