//! An in-memory executor standing in for both chains.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bridge_relayer_primitives::{
    batch::{DepositStatus, DepositTransfer, TransferBatch},
    errors::BatchError,
    types::{ActionId, Direction, INVALID_ACTION_ID},
};
use parking_lot::Mutex;
use primitive_types::U256;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{a_to_b::executor::AToBExecutor, b_to_a::executor::BToAExecutor, executor::BaseExecutor};

/// Action id Chain-B assigns to a transfer proposal.
pub const TRANSFER_ACTION_ID: ActionId = 42;

/// Action id Chain-B assigns to a status proposal.
pub const SET_STATUS_ACTION_ID: ActionId = 43;

/// Errors raised by [`MockExecutor`].
#[derive(Debug, Error)]
pub enum MockError {
    /// No batch is stored.
    #[error("nil batch")]
    NilBatch,

    /// Chain-A has no batch with the requested id.
    #[error("batch not found")]
    BatchNotFound,

    /// The stored batch is inconsistent.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// A scripted failure.
    #[error("transport error: {0}")]
    Transport(&'static str),
}

/// Builds a batch whose deposits carry the given nonces, each moving `amount`.
pub fn batch_with_nonces(id: u64, nonces: &[u64], amount: u64) -> TransferBatch {
    let deposits = nonces
        .iter()
        .map(|&nonce| DepositTransfer {
            nonce,
            to_bytes: vec![0xaa; 20],
            displayable_to: "to".to_string(),
            from_bytes: vec![0xbb; 32],
            displayable_from: "from".to_string(),
            token_bytes: b"TKN-1234".to_vec(),
            converted_token_bytes: vec![0xcc; 20],
            displayable_token: "TKN".to_string(),
            amount: U256::from(amount),
        })
        .collect();

    TransferBatch::new(id, deposits)
}

/// Both chains, the scratchpad and the retry counters of a single relayer.
///
/// Every mutating operation is recorded in [`MockExecutor::calls`] so tests can check what was
/// submitted on chain.
#[derive(Debug, Default)]
pub struct MockExecutor {
    /// Whether this relayer leads every round.
    pub leader: bool,

    /// Whether the external validator accepts the batch.
    pub batch_valid: bool,

    /// Whether the destination can cover the batch.
    pub tokens_available: bool,

    /// Operations that fail with a transport error.
    pub failing: BTreeSet<&'static str>,

    /// The scratchpad batch.
    pub batch: Option<TransferBatch>,

    /// The scratchpad action id.
    pub action_id: ActionId,

    /// The batch Chain-A serves.
    pub pending_on_a: Option<TransferBatch>,

    /// Last Chain-A batch id executed on Chain-B.
    pub last_executed_batch_id_on_b: u64,

    /// Last Chain-A deposit nonce executed on Chain-B.
    pub last_executed_deposit_nonce_on_b: u64,

    /// Whether the transfer was proposed on Chain-B.
    pub transfer_proposed_on_b: bool,

    /// Whether the status update was proposed on Chain-B.
    pub set_status_proposed_on_b: bool,

    /// Signatures gathered by each Chain-B action, this relayer's included.
    pub signatures_on_b: BTreeMap<ActionId, usize>,

    /// Actions this relayer signed on Chain-B.
    pub signed_on_b: BTreeSet<ActionId>,

    /// Actions executed on Chain-B.
    pub performed_on_b: BTreeSet<ActionId>,

    /// Signatures required by either chain.
    pub quorum: usize,

    /// The batch Chain-B serves.
    pub pending_on_b: Option<TransferBatch>,

    /// Relayer signatures collected for Chain-A, this relayer's included.
    pub signatures_on_a: usize,

    /// Whether the batch was executed on Chain-A.
    pub performed_on_a: bool,

    /// The statuses Chain-A reports once the batch was executed.
    pub statuses_on_a: Vec<DepositStatus>,

    /// Quorum checks allowed on Chain-A.
    pub max_retries_on_a: u64,

    /// Quorum checks allowed on Chain-B.
    pub max_retries_on_b: u64,

    /// Status proposal checks allowed on Chain-B.
    pub max_retries_on_was_proposed: u64,

    pub retries_on_a: u64,
    pub retries_on_b: u64,
    pub retries_on_was_proposed: u64,

    /// Mutating operations, in order.
    pub calls: Vec<&'static str>,

    /// Messages logged at warn or error level.
    pub errors: Mutex<Vec<String>>,
}

impl MockExecutor {
    /// A leader relayer with healthy chains, a quorum of 3 and a retry budget of 3 everywhere.
    pub fn new() -> Self {
        Self {
            leader: true,
            batch_valid: true,
            tokens_available: true,
            quorum: 3,
            max_retries_on_a: 3,
            max_retries_on_b: 3,
            max_retries_on_was_proposed: 3,
            ..Default::default()
        }
    }

    /// Makes `operation` fail from now on.
    pub fn fail(&mut self, operation: &'static str) {
        self.failing.insert(operation);
    }

    /// How many times `operation` was called.
    pub fn count(&self, operation: &str) -> usize {
        self.calls.iter().filter(|c| **c == operation).count()
    }

    /// Whether a logged error contains `needle`.
    pub fn logged(&self, needle: &str) -> bool {
        self.errors.lock().iter().any(|e| e.contains(needle))
    }

    fn check(&self, operation: &'static str) -> Result<(), MockError> {
        if self.failing.contains(operation) {
            return Err(MockError::Transport(operation));
        }
        Ok(())
    }

    fn stored(&self) -> Result<&TransferBatch, MockError> {
        self.batch.as_ref().ok_or(MockError::NilBatch)
    }

    fn stored_mut(&mut self) -> Result<&mut TransferBatch, MockError> {
        self.batch.as_mut().ok_or(MockError::NilBatch)
    }

    fn process_retries(counter: &mut u64, max: u64) -> bool {
        if *counter < max {
            *counter += 1;
            return false;
        }
        true
    }
}

#[async_trait]
impl BaseExecutor for MockExecutor {
    type Error = MockError;

    fn print_info(&self, level: tracing::Level, message: &str) {
        if level <= tracing::Level::WARN {
            self.errors.lock().push(message.to_string());
        }
    }

    fn my_turn_as_leader(&self) -> bool {
        self.leader
    }

    fn get_stored_batch(&self) -> Option<TransferBatch> {
        self.batch.clone()
    }

    fn get_stored_action_id(&self) -> ActionId {
        self.action_id
    }

    async fn check_chain_a_client_availability(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<(), MockError> {
        self.check("check_chain_a_client_availability")
    }

    async fn check_chain_b_client_availability(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<(), MockError> {
        self.check("check_chain_b_client_availability")
    }

    async fn validate_batch(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
    ) -> Result<bool, MockError> {
        self.check("validate_batch")?;
        Ok(self.batch_valid)
    }

    async fn check_available_tokens(
        &self,
        _cancel: &CancellationToken,
        _batch: &TransferBatch,
        _direction: Direction,
    ) -> Result<(), MockError> {
        self.check("check_available_tokens")?;
        if !self.tokens_available {
            return Err(MockError::Transport("not enough tokens"));
        }
        Ok(())
    }

    async fn was_action_signed_on_b(
        &self,
        _cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<bool, MockError> {
        self.check("was_action_signed_on_b")?;
        Ok(self.signed_on_b.contains(&action_id))
    }

    async fn sign_action_on_b(
        &mut self,
        _cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<(), MockError> {
        self.check("sign_action_on_b")?;
        self.calls.push("sign_action_on_b");
        self.signed_on_b.insert(action_id);
        *self.signatures_on_b.entry(action_id).or_default() += 1;
        Ok(())
    }

    async fn process_quorum_reached_on_b(
        &self,
        _cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<bool, MockError> {
        self.check("process_quorum_reached_on_b")?;
        let signatures = self.signatures_on_b.get(&action_id).copied().unwrap_or_default();
        Ok(signatures >= self.quorum)
    }

    async fn was_action_performed_on_b(
        &self,
        _cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<bool, MockError> {
        self.check("was_action_performed_on_b")?;
        Ok(self.performed_on_b.contains(&action_id))
    }

    async fn perform_action_on_b(
        &mut self,
        _cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<(), MockError> {
        self.check("perform_action_on_b")?;
        self.calls.push("perform_action_on_b");
        self.performed_on_b.insert(action_id);
        Ok(())
    }

    fn process_max_retries_on_b(&mut self) -> bool {
        Self::process_retries(&mut self.retries_on_b, self.max_retries_on_b)
    }

    fn reset_retries_on_b(&mut self) {
        self.retries_on_b = 0;
    }
}

#[async_trait]
impl AToBExecutor for MockExecutor {
    async fn get_last_executed_a_batch_id_on_b(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<u64, MockError> {
        self.check("get_last_executed_a_batch_id_on_b")?;
        Ok(self.last_executed_batch_id_on_b)
    }

    async fn get_and_store_batch_from_a(
        &mut self,
        _cancel: &CancellationToken,
        nonce: u64,
    ) -> Result<(), MockError> {
        self.check("get_and_store_batch_from_a")?;
        self.calls.push("get_and_store_batch_from_a");
        match &self.pending_on_a {
            Some(batch) if batch.id == nonce && !batch.is_empty() => {
                self.batch = Some(batch.clone());
                Ok(())
            }
            _ => Err(MockError::BatchNotFound),
        }
    }

    async fn verify_last_deposit_nonce_executed_on_a_batch(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<(), MockError> {
        self.check("verify_last_deposit_nonce_executed_on_a_batch")?;
        Ok(self
            .stored()?
            .verify_deposit_nonces(self.last_executed_deposit_nonce_on_b)?)
    }

    async fn was_transfer_proposed_on_b(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<bool, MockError> {
        self.check("was_transfer_proposed_on_b")?;
        Ok(self.transfer_proposed_on_b)
    }

    async fn propose_transfer_on_b(&mut self, _cancel: &CancellationToken) -> Result<(), MockError> {
        self.check("propose_transfer_on_b")?;
        self.stored()?;
        self.calls.push("propose_transfer_on_b");
        self.transfer_proposed_on_b = true;
        Ok(())
    }

    async fn get_and_store_action_id_for_propose_transfer_on_b(
        &mut self,
        _cancel: &CancellationToken,
    ) -> Result<ActionId, MockError> {
        self.check("get_and_store_action_id_for_propose_transfer_on_b")?;
        self.action_id = if self.transfer_proposed_on_b {
            TRANSFER_ACTION_ID
        } else {
            INVALID_ACTION_ID
        };
        Ok(self.action_id)
    }
}

#[async_trait]
impl BToAExecutor for MockExecutor {
    async fn get_batch_from_b(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Option<TransferBatch>, MockError> {
        self.check("get_batch_from_b")?;
        Ok(self.pending_on_b.clone())
    }

    fn store_batch_from_b(&mut self, batch: Option<TransferBatch>) -> Result<(), MockError> {
        self.batch = Some(batch.ok_or(MockError::NilBatch)?);
        Ok(())
    }

    async fn was_transfer_performed_on_a(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<bool, MockError> {
        self.check("was_transfer_performed_on_a")?;
        Ok(self.performed_on_a)
    }

    async fn sign_transfer_on_a(&mut self, _cancel: &CancellationToken) -> Result<(), MockError> {
        self.check("sign_transfer_on_a")?;
        self.stored()?;
        self.calls.push("sign_transfer_on_a");
        self.signatures_on_a += 1;
        Ok(())
    }

    async fn process_quorum_reached_on_a(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<bool, MockError> {
        self.check("process_quorum_reached_on_a")?;
        Ok(self.signatures_on_a >= self.quorum)
    }

    async fn perform_transfer_on_a(&mut self, _cancel: &CancellationToken) -> Result<(), MockError> {
        self.check("perform_transfer_on_a")?;
        let num_deposits = self.stored()?.deposits.len();
        self.calls.push("perform_transfer_on_a");
        self.performed_on_a = true;
        self.statuses_on_a = vec![DepositStatus::Executed; num_deposits];
        Ok(())
    }

    async fn wait_for_transfer_confirmation(&self, _cancel: &CancellationToken) {}

    async fn wait_and_return_final_batch_statuses(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<DepositStatus> {
        self.get_batch_statuses_from_a(cancel)
            .await
            .unwrap_or_default()
    }

    async fn get_batch_statuses_from_a(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Vec<DepositStatus>, MockError> {
        self.check("get_batch_statuses_from_a")?;
        Ok(self.statuses_on_a.clone())
    }

    fn set_stored_batch_statuses(&mut self, statuses: Vec<DepositStatus>) -> Result<(), MockError> {
        self.stored_mut()?.statuses = statuses;
        Ok(())
    }

    fn resolve_new_deposits_statuses(&mut self, num_deposits: usize) -> Result<(), MockError> {
        self.stored_mut()?.resolve_new_deposits(num_deposits);
        Ok(())
    }

    fn clear_stored_p2p_signatures_for_a(&self) {}

    async fn was_set_status_proposed_on_b(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<bool, MockError> {
        self.check("was_set_status_proposed_on_b")?;
        Ok(self.set_status_proposed_on_b)
    }

    async fn propose_set_status_on_b(
        &mut self,
        _cancel: &CancellationToken,
    ) -> Result<(), MockError> {
        self.check("propose_set_status_on_b")?;
        self.stored()?;
        self.calls.push("propose_set_status_on_b");
        self.set_status_proposed_on_b = true;
        Ok(())
    }

    async fn get_and_store_action_id_for_propose_set_status_on_b(
        &mut self,
        _cancel: &CancellationToken,
    ) -> Result<ActionId, MockError> {
        self.check("get_and_store_action_id_for_propose_set_status_on_b")?;
        self.action_id = if self.set_status_proposed_on_b {
            SET_STATUS_ACTION_ID
        } else {
            INVALID_ACTION_ID
        };
        Ok(self.action_id)
    }

    fn process_max_retries_on_a(&mut self) -> bool {
        Self::process_retries(&mut self.retries_on_a, self.max_retries_on_a)
    }

    fn reset_retries_on_a(&mut self) {
        self.retries_on_a = 0;
    }

    fn process_max_retries_on_was_transfer_proposed_on_b(&mut self) -> bool {
        Self::process_retries(&mut self.retries_on_was_proposed, self.max_retries_on_was_proposed)
    }

    fn reset_retries_on_was_transfer_proposed_on_b(&mut self) {
        self.retries_on_was_proposed = 0;
    }
}
