//! In-memory collaborators for the executor tests.

#![allow(unreachable_pub)]

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use bridge_relayer_common::status::InMemoryStatusHandler;
use bridge_relayer_p2p_service::P2PError;
use bridge_relayer_primitives::{
    batch::{DepositStatus, DepositTransfer, TransferBatch},
    types::{ActionId, Direction, MessageHash},
};
use parking_lot::Mutex;
use primitive_types::U256;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ExecutorConfig,
    errors::ClientError,
    executor::{BridgeExecutor, BridgeExecutorArgs},
    traits::{
        ChainAClient, ChainBClient, ClientResult, DisabledBatchValidator, SignaturesBroadcaster,
        SignaturesSource, TopologyProvider,
    },
};

/// Action id of every transfer proposal.
pub const TRANSFER_ACTION_ID: ActionId = 42;

/// Action id of every status proposal.
pub const SET_STATUS_ACTION_ID: ActionId = 43;

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
            converted_token_bytes: Vec::new(),
            displayable_token: "tkn".to_string(),
            amount: U256::from(100),
        })
        .collect();

    TransferBatch::new(id, deposits)
}

/// A config with a one second wait on Chain-A and two retries per counter.
pub fn config() -> ExecutorConfig {
    ExecutorConfig {
        time_for_wait_on_a: Duration::from_secs(1),
        max_quorum_retries_on_a: 2,
        max_quorum_retries_on_b: 2,
        max_retries_on_was_transfer_proposed: 2,
    }
}

/// Executor arguments with a leader topology and no validator.
pub fn args(
    direction: Direction,
    chain_a: Arc<MockChainA>,
    chain_b: Arc<MockChainB>,
    signatures: Arc<MockSignatures>,
    config: ExecutorConfig,
) -> BridgeExecutorArgs {
    BridgeExecutorArgs {
        name: format!("{direction}"),
        direction,
        chain_a,
        chain_b,
        topology: Arc::new(FixedTopology(true)),
        validator: Arc::new(DisabledBatchValidator),
        broadcaster: Arc::new(LoopbackBroadcaster(signatures.clone())),
        signatures,
        status_handler: Arc::new(InMemoryStatusHandler::new(direction.to_string())),
        config,
    }
}

/// A leader executor over the given chains. Also returns its signature store.
pub fn executor_with(
    direction: Direction,
    chain_a: Arc<MockChainA>,
    chain_b: Arc<MockChainB>,
) -> (BridgeExecutor, Arc<MockSignatures>) {
    let signatures = Arc::new(MockSignatures::default());
    let executor = BridgeExecutor::new(args(
        direction,
        chain_a,
        chain_b,
        signatures.clone(),
        config(),
    ))
    .expect("valid config");

    (executor, signatures)
}

fn check_balance(token: &[u8], amount: U256, available: U256) -> ClientResult<()> {
    if amount > available {
        return Err(ClientError::InsufficientBalance {
            token: hex::encode(token),
            required: amount,
            available,
        });
    }

    Ok(())
}

#[derive(Debug)]
pub struct MockChainA {
    pub batch: Mutex<Option<TransferBatch>>,
    pub executed: Mutex<bool>,
    pub executed_polls: Mutex<usize>,
    pub quorum: Mutex<u64>,
    pub statuses: Mutex<Vec<DepositStatus>>,
    pub statuses_ready_after: Mutex<usize>,
    pub status_polls: Mutex<usize>,
    pub executed_with: Mutex<Vec<Vec<Vec<u8>>>>,
    pub balance: Mutex<U256>,
}

impl Default for MockChainA {
    fn default() -> Self {
        Self {
            batch: Mutex::new(None),
            executed: Mutex::new(false),
            executed_polls: Mutex::new(0),
            quorum: Mutex::new(1),
            statuses: Mutex::new(Vec::new()),
            statuses_ready_after: Mutex::new(0),
            status_polls: Mutex::new(0),
            executed_with: Mutex::new(Vec::new()),
            balance: Mutex::new(U256::MAX),
        }
    }
}

impl MockChainA {
    /// Reports `statuses` from the `polls`-th status query on.
    pub fn statuses_after_polls(&self, polls: usize, statuses: Vec<DepositStatus>) {
        *self.statuses_ready_after.lock() = polls;
        *self.statuses.lock() = statuses;
    }
}

#[async_trait]
impl ChainAClient for MockChainA {
    async fn get_batch(
        &self,
        _cancel: &CancellationToken,
        _nonce: u64,
    ) -> ClientResult<Option<TransferBatch>> {
        Ok(self.batch.lock().clone())
    }

    async fn was_executed(&self, _cancel: &CancellationToken, _batch_id: u64) -> ClientResult<bool> {
        *self.executed_polls.lock() += 1;
        Ok(*self.executed.lock())
    }

    fn sign_message_hash(&self, message_hash: &MessageHash) -> ClientResult<Vec<u8>> {
        let mut signature = message_hash.to_bytes().to_vec();
        signature.resize(65, 1);
        Ok(signature)
    }

    async fn execute_transfer(
        &self,
        _cancel: &CancellationToken,
        _message_hash: &MessageHash,
        _batch: &TransferBatch,
        signatures: Vec<Vec<u8>>,
    ) -> ClientResult<String> {
        self.executed_with.lock().push(signatures);
        *self.executed.lock() = true;
        Ok("0xexecute".to_string())
    }

    async fn quorum(&self, _cancel: &CancellationToken) -> ClientResult<u64> {
        Ok(*self.quorum.lock())
    }

    async fn get_transactions_statuses(
        &self,
        _cancel: &CancellationToken,
        _batch_id: u64,
    ) -> ClientResult<Vec<DepositStatus>> {
        let mut polls = self.status_polls.lock();
        *polls += 1;
        if *polls < *self.statuses_ready_after.lock() {
            return Ok(Vec::new());
        }

        Ok(self.statuses.lock().clone())
    }

    async fn check_client_availability(&self, _cancel: &CancellationToken) -> ClientResult<()> {
        Ok(())
    }

    async fn check_required_balance(
        &self,
        _cancel: &CancellationToken,
        token: &[u8],
        amount: U256,
    ) -> ClientResult<()> {
        check_balance(token, amount, *self.balance.lock())
    }
}

#[derive(Debug)]
pub struct MockChainB {
    pub pending: Mutex<Option<TransferBatch>>,
    pub last_executed_a_batch_id: Mutex<u64>,
    pub last_a_deposit_nonce: Mutex<u64>,
    pub proposed_transfer: Mutex<bool>,
    pub proposed_set_status: Mutex<bool>,
    pub signed: Mutex<Vec<ActionId>>,
    pub performed: Mutex<Vec<ActionId>>,
    pub quorum_reached: Mutex<bool>,
    pub balance: Mutex<U256>,
    pub calls: Mutex<BTreeMap<&'static str, usize>>,
}

impl Default for MockChainB {
    fn default() -> Self {
        Self {
            pending: Mutex::new(None),
            last_executed_a_batch_id: Mutex::new(0),
            last_a_deposit_nonce: Mutex::new(0),
            proposed_transfer: Mutex::new(false),
            proposed_set_status: Mutex::new(false),
            signed: Mutex::new(Vec::new()),
            performed: Mutex::new(Vec::new()),
            quorum_reached: Mutex::new(true),
            balance: Mutex::new(U256::MAX),
            calls: Mutex::new(BTreeMap::new()),
        }
    }
}

impl MockChainB {
    /// How many times the mutating call `name` was made.
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or_default()
    }

    fn record(&self, name: &'static str) -> ClientResult<String> {
        *self.calls.lock().entry(name).or_default() += 1;
        Ok(format!("0x{name}"))
    }
}

#[async_trait]
impl ChainBClient for MockChainB {
    async fn get_pending_batch(
        &self,
        _cancel: &CancellationToken,
    ) -> ClientResult<Option<TransferBatch>> {
        Ok(self.pending.lock().clone())
    }

    async fn get_last_executed_a_batch_id(&self, _cancel: &CancellationToken) -> ClientResult<u64> {
        Ok(*self.last_executed_a_batch_id.lock())
    }

    async fn get_last_a_deposit_nonce(&self, _cancel: &CancellationToken) -> ClientResult<u64> {
        Ok(*self.last_a_deposit_nonce.lock())
    }

    async fn get_action_id_for_propose_transfer(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
    ) -> ClientResult<ActionId> {
        Ok(TRANSFER_ACTION_ID)
    }

    async fn get_action_id_for_set_status(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
    ) -> ClientResult<ActionId> {
        Ok(SET_STATUS_ACTION_ID)
    }

    async fn was_proposed_transfer(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
    ) -> ClientResult<bool> {
        Ok(*self.proposed_transfer.lock())
    }

    async fn was_proposed_set_status(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
    ) -> ClientResult<bool> {
        Ok(*self.proposed_set_status.lock())
    }

    async fn was_signed(&self, _cancel: &CancellationToken, action_id: ActionId) -> ClientResult<bool> {
        Ok(self.signed.lock().contains(&action_id))
    }

    async fn was_executed(
        &self,
        _cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ClientResult<bool> {
        Ok(self.performed.lock().contains(&action_id))
    }

    async fn quorum_reached(
        &self,
        _cancel: &CancellationToken,
        _action_id: ActionId,
    ) -> ClientResult<bool> {
        Ok(*self.quorum_reached.lock())
    }

    async fn propose_transfer(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
    ) -> ClientResult<String> {
        *self.proposed_transfer.lock() = true;
        self.record("propose_transfer")
    }

    async fn propose_set_status(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
    ) -> ClientResult<String> {
        *self.proposed_set_status.lock() = true;
        self.record("propose_set_status")
    }

    async fn sign(&self, _cancel: &CancellationToken, action_id: ActionId) -> ClientResult<String> {
        self.signed.lock().push(action_id);
        self.record("sign")
    }

    async fn perform_action(
        &self,
        _cancel: &CancellationToken,
        action_id: ActionId,
        _batch: &TransferBatch,
    ) -> ClientResult<String> {
        self.performed.lock().push(action_id);
        self.record("perform_action")
    }

    async fn check_client_availability(&self, _cancel: &CancellationToken) -> ClientResult<()> {
        Ok(())
    }

    async fn check_required_balance(
        &self,
        _cancel: &CancellationToken,
        token: &[u8],
        amount: U256,
    ) -> ClientResult<()> {
        check_balance(token, amount, *self.balance.lock())
    }
}

/// Distinct signatures per message hash.
#[derive(Debug, Default)]
pub struct MockSignatures(Mutex<BTreeMap<MessageHash, Vec<Vec<u8>>>>);

impl MockSignatures {
    pub fn add(&self, message_hash: MessageHash, signature: Vec<u8>) {
        let mut stored = self.0.lock();
        let signatures = stored.entry(message_hash).or_default();
        if !signatures.contains(&signature) {
            signatures.push(signature);
        }
    }
}

impl SignaturesSource for MockSignatures {
    fn signatures(&self, message_hash: &MessageHash) -> Vec<Vec<u8>> {
        self.0.lock().get(message_hash).cloned().unwrap_or_default()
    }

    fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Delivers broadcasts straight into the local store.
#[derive(Debug)]
pub struct LoopbackBroadcaster(pub Arc<MockSignatures>);

#[async_trait]
impl SignaturesBroadcaster for LoopbackBroadcaster {
    async fn broadcast_signature(
        &self,
        signature: Vec<u8>,
        message_hash: MessageHash,
    ) -> Result<(), P2PError> {
        self.0.add(message_hash, signature);
        Ok(())
    }
}

/// Stores broadcasts locally but, like a node with no peers yet, fails to publish them.
#[derive(Debug)]
pub struct PeerlessBroadcaster(pub Arc<MockSignatures>);

#[async_trait]
impl SignaturesBroadcaster for PeerlessBroadcaster {
    async fn broadcast_signature(
        &self,
        signature: Vec<u8>,
        message_hash: MessageHash,
    ) -> Result<(), P2PError> {
        self.0.add(message_hash, signature);
        Err(P2PError::Publish {
            topic: "relayers/sign".to_string(),
            reason: "InsufficientPeers".to_string(),
        })
    }
}

#[derive(Debug)]
pub struct FixedTopology(pub bool);

impl TopologyProvider for FixedTopology {
    fn my_turn_as_leader(&self) -> bool {
        self.0
    }
}
