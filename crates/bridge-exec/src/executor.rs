//! The executor both relay directions run against.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_relayer_common::status::{
    StatusHandler, METRIC_LAST_ERROR, METRIC_NUM_BATCHES, METRIC_NUM_TRANSACTIONS_REJECTED,
    METRIC_NUM_TRANSACTIONS_SUCCEEDED,
};
use bridge_relayer_p2p_service::P2PError;
use bridge_relayer_primitives::{
    batch::{DepositStatus, TransferBatch},
    eth,
    types::{ActionId, Direction, MessageHash, INVALID_ACTION_ID},
};
use bridge_relayer_sm::{
    a_to_b::executor::AToBExecutor, b_to_a::executor::BToAExecutor, executor::BaseExecutor,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn, Level};

use crate::{
    config::{ExecutorConfig, WAIT_SPLITS},
    errors::{ExecutorError, ExecutorResult},
    retries::{RetryCounter, RetryCounters},
    traits::{
        BatchValidator, ChainAClient, ChainBClient, SignaturesBroadcaster, SignaturesSource,
        TopologyProvider,
    },
};

/// Arguments for [`BridgeExecutor::new`].
#[derive(Debug)]
pub struct BridgeExecutorArgs {
    /// Label used in logs.
    pub name: String,

    /// The direction this executor relays.
    pub direction: Direction,

    /// Chain-A access.
    pub chain_a: Arc<dyn ChainAClient>,

    /// Chain-B access.
    pub chain_b: Arc<dyn ChainBClient>,

    /// Leader election.
    pub topology: Arc<dyn TopologyProvider>,

    /// The external batch validator.
    pub validator: Arc<dyn BatchValidator>,

    /// Shares this relayer's Chain-A signatures.
    pub broadcaster: Arc<dyn SignaturesBroadcaster>,

    /// The Chain-A signatures gathered from the federation.
    pub signatures: Arc<dyn SignaturesSource>,

    /// Receives the metrics of the direction.
    pub status_handler: Arc<dyn StatusHandler>,

    /// Wait times and retry budgets.
    pub config: ExecutorConfig,
}

/// Holds the batch in flight for one direction and performs every chain operation the steps ask
/// for.
#[derive(Debug)]
pub struct BridgeExecutor {
    name: String,
    direction: Direction,
    chain_a: Arc<dyn ChainAClient>,
    chain_b: Arc<dyn ChainBClient>,
    topology: Arc<dyn TopologyProvider>,
    validator: Arc<dyn BatchValidator>,
    broadcaster: Arc<dyn SignaturesBroadcaster>,
    signatures: Arc<dyn SignaturesSource>,
    status_handler: Arc<dyn StatusHandler>,
    config: ExecutorConfig,

    batch: Option<TransferBatch>,
    action_id: ActionId,
    message_hash: MessageHash,
    retries: RetryCounters,
}

impl BridgeExecutor {
    /// Creates an executor with nothing in flight.
    pub fn new(args: BridgeExecutorArgs) -> ExecutorResult<Self> {
        args.config.validate()?;

        let retries = RetryCounters {
            on_a: RetryCounter::new(args.config.max_quorum_retries_on_a),
            on_b: RetryCounter::new(args.config.max_quorum_retries_on_b),
            on_was_proposed: RetryCounter::new(args.config.max_retries_on_was_transfer_proposed),
        };

        Ok(Self {
            name: args.name,
            direction: args.direction,
            chain_a: args.chain_a,
            chain_b: args.chain_b,
            topology: args.topology,
            validator: args.validator,
            broadcaster: args.broadcaster,
            signatures: args.signatures,
            status_handler: args.status_handler,
            config: args.config,
            batch: None,
            action_id: INVALID_ACTION_ID,
            message_hash: MessageHash::default(),
            retries,
        })
    }

    /// The message hash signed for the batch in flight.
    pub const fn message_hash(&self) -> MessageHash {
        self.message_hash
    }

    /// The retry counters.
    pub const fn retries(&self) -> &RetryCounters {
        &self.retries
    }

    fn stored_batch(&self) -> ExecutorResult<&TransferBatch> {
        self.batch.as_ref().ok_or(ExecutorError::NilBatch)
    }

    fn stored_batch_mut(&mut self) -> ExecutorResult<&mut TransferBatch> {
        self.batch.as_mut().ok_or(ExecutorError::NilBatch)
    }

    async fn quorum_on_a(&self, cancel: &CancellationToken) -> ExecutorResult<u64> {
        let quorum = self
            .chain_a
            .quorum(cancel)
            .await
            .map_err(ExecutorError::ChainA)?;
        if quorum == 0 {
            return Err(ExecutorError::InvalidQuorumValue(quorum));
        }

        Ok(quorum)
    }

    /// Sleeps one split of the Chain-A wait. Returns `false` if `cancel` fired first.
    async fn wait_one_split(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(name = %self.name, "wait interrupted by cancellation");
                false
            }
            _ = tokio::time::sleep(self.config.wait_split()) => true,
        }
    }

    fn record_statuses(&self, statuses: &[DepositStatus]) {
        let count = |wanted: DepositStatus| statuses.iter().filter(|s| **s == wanted).count() as i64;

        self.status_handler
            .add_int_metric(METRIC_NUM_TRANSACTIONS_SUCCEEDED, count(DepositStatus::Executed));
        self.status_handler
            .add_int_metric(METRIC_NUM_TRANSACTIONS_REJECTED, count(DepositStatus::Rejected));
    }
}

#[async_trait]
impl BaseExecutor for BridgeExecutor {
    type Error = ExecutorError;

    fn print_info(&self, level: Level, message: &str) {
        let name = &self.name;
        match level {
            Level::ERROR => error!(%name, "{message}"),
            Level::WARN => warn!(%name, "{message}"),
            Level::INFO => info!(%name, "{message}"),
            Level::DEBUG => debug!(%name, "{message}"),
            _ => trace!(%name, "{message}"),
        }

        if level == Level::ERROR || level == Level::WARN {
            self.status_handler
                .set_string_metric(METRIC_LAST_ERROR, &format!("{level}: {message}"));
        }
    }

    fn my_turn_as_leader(&self) -> bool {
        self.topology.my_turn_as_leader()
    }

    fn get_stored_batch(&self) -> Option<TransferBatch> {
        self.batch.clone()
    }

    fn get_stored_action_id(&self) -> ActionId {
        self.action_id
    }

    async fn check_chain_a_client_availability(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<()> {
        self.chain_a
            .check_client_availability(cancel)
            .await
            .map_err(ExecutorError::ChainA)
    }

    async fn check_chain_b_client_availability(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<()> {
        self.chain_b
            .check_client_availability(cancel)
            .await
            .map_err(ExecutorError::ChainB)
    }

    async fn validate_batch(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ExecutorResult<bool> {
        self.validator
            .validate_batch(cancel, self.direction, batch)
            .await
            .map_err(ExecutorError::Validator)
    }

    async fn check_available_tokens(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
        direction: Direction,
    ) -> ExecutorResult<()> {
        for (token, amount) in batch.cumulated_amounts() {
            trace!(token = %hex::encode(&token), %amount, %direction, "checking available tokens");

            match direction {
                Direction::AToB => self
                    .chain_b
                    .check_required_balance(cancel, &token, amount)
                    .await
                    .map_err(ExecutorError::ChainB)?,
                Direction::BToA => self
                    .chain_a
                    .check_required_balance(cancel, &token, amount)
                    .await
                    .map_err(ExecutorError::ChainA)?,
            }
        }

        Ok(())
    }

    async fn was_action_signed_on_b(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ExecutorResult<bool> {
        self.chain_b
            .was_signed(cancel, action_id)
            .await
            .map_err(ExecutorError::ChainB)
    }

    async fn sign_action_on_b(
        &mut self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ExecutorResult<()> {
        let hash = self
            .chain_b
            .sign(cancel, action_id)
            .await
            .map_err(ExecutorError::ChainB)?;
        info!(name = %self.name, %hash, %action_id, "signed proposed action");

        Ok(())
    }

    async fn process_quorum_reached_on_b(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ExecutorResult<bool> {
        self.chain_b
            .quorum_reached(cancel, action_id)
            .await
            .map_err(ExecutorError::ChainB)
    }

    async fn was_action_performed_on_b(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ExecutorResult<bool> {
        self.chain_b
            .was_executed(cancel, action_id)
            .await
            .map_err(ExecutorError::ChainB)
    }

    async fn perform_action_on_b(
        &mut self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ExecutorResult<()> {
        let batch = self.stored_batch()?;
        let hash = self
            .chain_b
            .perform_action(cancel, action_id, batch)
            .await
            .map_err(ExecutorError::ChainB)?;
        info!(name = %self.name, %hash, batch_id = batch.id, %action_id, "sent perform action transaction");

        Ok(())
    }

    fn process_max_retries_on_b(&mut self) -> bool {
        self.retries.on_b.process()
    }

    fn reset_retries_on_b(&mut self) {
        self.retries.on_b.reset();
    }
}

#[async_trait]
impl AToBExecutor for BridgeExecutor {
    async fn get_last_executed_a_batch_id_on_b(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<u64> {
        let batch_id = self
            .chain_b
            .get_last_executed_a_batch_id(cancel)
            .await
            .map_err(ExecutorError::ChainB)?;
        self.status_handler
            .set_int_metric(METRIC_NUM_BATCHES, batch_id as i64);

        Ok(batch_id)
    }

    async fn get_and_store_batch_from_a(
        &mut self,
        cancel: &CancellationToken,
        nonce: u64,
    ) -> ExecutorResult<()> {
        let batch = self
            .chain_a
            .get_batch(cancel, nonce)
            .await
            .map_err(ExecutorError::ChainA)?;

        match batch {
            Some(batch) if batch.id == nonce && !batch.is_empty() => {
                self.batch = Some(batch);
                Ok(())
            }
            other => Err(ExecutorError::BatchNotFound {
                requested: nonce,
                got: other.map(|b| b.id),
            }),
        }
    }

    async fn verify_last_deposit_nonce_executed_on_a_batch(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<()> {
        let batch = self.stored_batch()?;
        let last_nonce = self
            .chain_b
            .get_last_a_deposit_nonce(cancel)
            .await
            .map_err(ExecutorError::ChainB)?;

        batch.verify_deposit_nonces(last_nonce)?;
        Ok(())
    }

    async fn was_transfer_proposed_on_b(&self, cancel: &CancellationToken) -> ExecutorResult<bool> {
        let batch = self.stored_batch()?;
        self.chain_b
            .was_proposed_transfer(cancel, batch)
            .await
            .map_err(ExecutorError::ChainB)
    }

    async fn propose_transfer_on_b(&mut self, cancel: &CancellationToken) -> ExecutorResult<()> {
        let batch = self.stored_batch()?;
        let hash = self
            .chain_b
            .propose_transfer(cancel, batch)
            .await
            .map_err(ExecutorError::ChainB)?;
        info!(name = %self.name, %hash, batch_id = batch.id, "proposed transfer");

        Ok(())
    }

    async fn get_and_store_action_id_for_propose_transfer_on_b(
        &mut self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<ActionId> {
        let batch = self.stored_batch()?;
        let action_id = self
            .chain_b
            .get_action_id_for_propose_transfer(cancel, batch)
            .await
            .map_err(ExecutorError::ChainB)?;

        self.action_id = action_id;
        Ok(action_id)
    }
}

#[async_trait]
impl BToAExecutor for BridgeExecutor {
    async fn get_batch_from_b(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<Option<TransferBatch>> {
        let batch = self
            .chain_b
            .get_pending_batch(cancel)
            .await
            .map_err(ExecutorError::ChainB)?;

        if let Some(batch) = &batch {
            self.status_handler
                .set_int_metric(METRIC_NUM_BATCHES, batch.id.saturating_sub(1) as i64);
        }

        Ok(batch)
    }

    fn store_batch_from_b(&mut self, batch: Option<TransferBatch>) -> ExecutorResult<()> {
        self.batch = Some(batch.ok_or(ExecutorError::NilBatch)?);
        Ok(())
    }

    async fn was_transfer_performed_on_a(&self, cancel: &CancellationToken) -> ExecutorResult<bool> {
        let batch = self.stored_batch()?;
        self.chain_a
            .was_executed(cancel, batch.id)
            .await
            .map_err(ExecutorError::ChainA)
    }

    async fn sign_transfer_on_a(&mut self, _cancel: &CancellationToken) -> ExecutorResult<()> {
        let batch = self.stored_batch()?;
        let hash = eth::batch_message_hash(batch);
        info!(name = %self.name, %hash, batch_id = batch.id, "generated message hash for chain A");

        let signature = self
            .chain_a
            .sign_message_hash(&hash)
            .map_err(ExecutorError::ChainA)?;

        self.message_hash = hash;
        match self.broadcaster.broadcast_signature(signature, hash).await {
            Ok(()) => Ok(()),
            // kept locally and replayed to peers when they join
            Err(e @ P2PError::Publish { .. }) => {
                warn!(name = %self.name, %hash, %e, "signature not published yet");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn process_quorum_reached_on_a(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<bool> {
        let quorum = self.quorum_on_a(cancel).await?;
        let collected = self.signatures.signatures(&self.message_hash).len() as u64;
        debug!(name = %self.name, %quorum, %collected, hash = %self.message_hash, "checked quorum on chain A");

        Ok(collected >= quorum)
    }

    async fn perform_transfer_on_a(&mut self, cancel: &CancellationToken) -> ExecutorResult<()> {
        let batch = self.stored_batch()?;
        let quorum = self.quorum_on_a(cancel).await?;

        let mut signatures = self.signatures.signatures(&self.message_hash);
        signatures.truncate(quorum as usize);
        info!(name = %self.name, "executing transfer {batch}");

        let hash = self
            .chain_a
            .execute_transfer(cancel, &self.message_hash, batch, signatures)
            .await
            .map_err(ExecutorError::ChainA)?;
        info!(name = %self.name, %hash, batch_id = batch.id, "sent execute transfer");

        Ok(())
    }

    async fn wait_for_transfer_confirmation(&self, cancel: &CancellationToken) {
        for _ in 0..WAIT_SPLITS {
            if !self.wait_one_split(cancel).await {
                return;
            }

            if let Ok(true) = self.was_transfer_performed_on_a(cancel).await {
                return;
            }
        }
    }

    async fn wait_and_return_final_batch_statuses(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<DepositStatus> {
        for _ in 0..WAIT_SPLITS {
            if !self.wait_one_split(cancel).await {
                return Vec::new();
            }

            match self.get_batch_statuses_from_a(cancel).await {
                Ok(statuses) if !statuses.is_empty() => {
                    debug!(name = %self.name, ?statuses, "got final batch statuses");
                    return statuses;
                }
                Ok(_) => debug!(name = %self.name, "no status available"),
                Err(e) => debug!(name = %self.name, %e, "got message while fetching batch statuses"),
            }
        }

        Vec::new()
    }

    async fn get_batch_statuses_from_a(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<Vec<DepositStatus>> {
        let batch = self.stored_batch()?;
        self.chain_a
            .get_transactions_statuses(cancel, batch.id)
            .await
            .map_err(ExecutorError::ChainA)
    }

    fn set_stored_batch_statuses(&mut self, statuses: Vec<DepositStatus>) -> ExecutorResult<()> {
        self.record_statuses(&statuses);
        // the length is reconciled afterwards by `resolve_new_deposits_statuses`
        self.stored_batch_mut()?.statuses = statuses;

        Ok(())
    }

    fn resolve_new_deposits_statuses(&mut self, num_deposits: usize) -> ExecutorResult<()> {
        self.stored_batch_mut()?.resolve_new_deposits(num_deposits);
        Ok(())
    }

    fn clear_stored_p2p_signatures_for_a(&self) {
        self.signatures.clear();
        info!(name = %self.name, "cleared stored P2P signatures");
    }

    async fn was_set_status_proposed_on_b(
        &self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<bool> {
        let batch = self.stored_batch()?;
        self.chain_b
            .was_proposed_set_status(cancel, batch)
            .await
            .map_err(ExecutorError::ChainB)
    }

    async fn propose_set_status_on_b(&mut self, cancel: &CancellationToken) -> ExecutorResult<()> {
        let batch = self.stored_batch()?;
        let hash = self
            .chain_b
            .propose_set_status(cancel, batch)
            .await
            .map_err(ExecutorError::ChainB)?;
        info!(name = %self.name, %hash, batch_id = batch.id, "proposed set status");

        Ok(())
    }

    async fn get_and_store_action_id_for_propose_set_status_on_b(
        &mut self,
        cancel: &CancellationToken,
    ) -> ExecutorResult<ActionId> {
        let batch = self.stored_batch()?;
        let action_id = self
            .chain_b
            .get_action_id_for_set_status(cancel, batch)
            .await
            .map_err(ExecutorError::ChainB)?;

        self.action_id = action_id;
        Ok(action_id)
    }

    fn process_max_retries_on_a(&mut self) -> bool {
        self.retries.on_a.process()
    }

    fn reset_retries_on_a(&mut self) {
        self.retries.on_a.reset();
    }

    fn process_max_retries_on_was_transfer_proposed_on_b(&mut self) -> bool {
        self.retries.on_was_proposed.process()
    }

    fn reset_retries_on_was_transfer_proposed_on_b(&mut self) {
        self.retries.on_was_proposed.reset();
    }
}
