//! Relaying a Chain-B batch onto Chain-A.

use async_trait::async_trait;
use bridge_relayer_primitives::types::Direction;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    b_to_a::{executor::BToAExecutor, state::BToAStep},
    executor::{error, warn},
    step::Step,
};

/// Fetches the batch pending on Chain-B.
///
/// A batch already executed on Chain-A skips straight to the status resolution, which is how a
/// relayer that restarted mid-way catches up.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPendingFromB;

#[async_trait]
impl<E: BToAExecutor> Step<E> for GetPendingFromB {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::GetPendingFromB
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        let stay = <Self as Step<E>>::identifier(self);

        if let Err(e) = executor.check_chain_b_client_availability(cancel).await {
            debug!(%e, "chain B client unavailable");
        }
        if let Err(e) = executor.check_chain_a_client_availability(cancel).await {
            debug!(%e, "chain A client unavailable");
        }

        executor.reset_retries_on_a();
        executor.reset_retries_on_b();
        executor.reset_retries_on_was_transfer_proposed_on_b();

        let batch = match executor.get_batch_from_b(cancel).await {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                debug!("no new batch found on chain B");
                return stay;
            }
            Err(e) => {
                debug!(%e, "cannot fetch chain B batch");
                return stay;
            }
        };

        let batch_id = batch.id;
        let num_deposits = batch.deposits.len();
        if let Err(e) = executor.store_batch_from_b(Some(batch.clone())) {
            error(executor, format!("error storing chain B batch {batch_id}: {e}"));
            return stay;
        }
        info!(%batch_id, deposits = num_deposits, "fetched new batch from chain B");

        match executor.validate_batch(cancel, &batch).await {
            Ok(true) => {}
            Ok(false) => {
                warn(executor, format!("batch {batch_id} not valid"));
                return stay;
            }
            Err(e) => {
                error(executor, format!("error validating chain B batch {batch_id}: {e}"));
                return stay;
            }
        }

        match executor.was_transfer_performed_on_a(cancel).await {
            Ok(true) => {
                info!(%batch_id, "transfer already performed on chain A");
                return BToAStep::ResolveSetStatus;
            }
            Ok(false) => {}
            Err(e) => {
                error(executor, format!("error determining if transfer {batch_id} was performed: {e}"));
                return stay;
            }
        }

        let Some(batch) = executor.get_stored_batch() else {
            return stay;
        };
        if let Err(e) = executor.check_available_tokens(cancel, &batch, Direction::BToA).await {
            error(executor, format!("error checking available tokens for batch {batch_id}: {e}"));
            return stay;
        }

        BToAStep::SignProposedTransferOnA
    }
}

/// Signs the stored batch for Chain-A and shares the signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignProposedTransferOnA;

#[async_trait]
impl<E: BToAExecutor> Step<E> for SignProposedTransferOnA {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::SignProposedTransferOnA
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        let Some(batch) = executor.get_stored_batch() else {
            error(executor, "nil batch stored");
            return BToAStep::INITIAL;
        };

        if let Err(e) = executor.sign_transfer_on_a(cancel).await {
            error(executor, format!("error signing transfer of batch {}: {e}", batch.id));
            return BToAStep::INITIAL;
        }
        info!(batch_id = batch.id, "signed transfer for chain A");

        BToAStep::WaitForQuorumOnTransfer
    }
}

/// Waits for a quorum of relayer signatures on the stored batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitForQuorumOnTransfer;

#[async_trait]
impl<E: BToAExecutor> Step<E> for WaitForQuorumOnTransfer {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::WaitForQuorumOnTransfer
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        if executor.process_max_retries_on_a() {
            error(executor, "max retries reached while waiting for quorum on transfer");
            return BToAStep::INITIAL;
        }

        match executor.process_quorum_reached_on_a(cancel).await {
            Ok(true) => {
                info!("quorum reached on transfer");
                BToAStep::PerformTransfer
            }
            Ok(false) => <Self as Step<E>>::identifier(self),
            Err(e) => {
                error(executor, format!("error while checking the quorum on transfer: {e}"));
                BToAStep::INITIAL
            }
        }
    }
}

/// Submits the stored batch on Chain-A if this relayer leads the round.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformTransfer;

#[async_trait]
impl<E: BToAExecutor> Step<E> for PerformTransfer {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::PerformTransfer
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        match executor.was_transfer_performed_on_a(cancel).await {
            Ok(true) => {
                info!("transfer performed on chain A");
                return BToAStep::ResolveSetStatus;
            }
            Ok(false) => {}
            Err(e) => {
                error(executor, format!("error determining if transfer was performed: {e}"));
                return BToAStep::INITIAL;
            }
        }

        if !executor.my_turn_as_leader() {
            return BToAStep::WaitTransferConfirmation;
        }

        if let Err(e) = executor.perform_transfer_on_a(cancel).await {
            error(executor, format!("error performing transfer on chain A: {e}"));
            return BToAStep::INITIAL;
        }
        info!("transfer submitted on chain A");

        BToAStep::WaitTransferConfirmation
    }
}

/// Gives the leader's transfer time to land before checking it again.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitTransferConfirmation;

#[async_trait]
impl<E: BToAExecutor> Step<E> for WaitTransferConfirmation {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::WaitTransferConfirmation
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        executor.wait_for_transfer_confirmation(cancel).await;

        BToAStep::PerformTransfer
    }
}
