//! Recording the Chain-A outcome of a batch back on Chain-B.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    b_to_a::{executor::BToAExecutor, state::BToAStep},
    executor::error,
    multisig::{self, Verdict},
    step::Step,
};

/// Reads the deposit statuses Chain-A produced and stores them in the batch.
///
/// Chain-B may have appended deposits to the batch since it was fetched. Those are marked
/// rejected so the statuses cover the batch as Chain-B now sees it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveSetStatus;

#[async_trait]
impl<E: BToAExecutor> Step<E> for ResolveSetStatus {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::ResolveSetStatus
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        executor.clear_stored_p2p_signatures_for_a();

        if executor.get_stored_batch().is_none() {
            error(executor, "nil batch stored");
            return BToAStep::INITIAL;
        }

        let current = match executor.get_batch_from_b(cancel).await {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                error(executor, "nil batch fetched from chain B");
                return BToAStep::INITIAL;
            }
            Err(e) => {
                error(executor, format!("error while fetching batch from chain B: {e}"));
                return BToAStep::INITIAL;
            }
        };

        let statuses = executor.wait_and_return_final_batch_statuses(cancel).await;
        if statuses.is_empty() {
            debug!(batch_id = current.id, "no final statuses on chain A yet");
            return BToAStep::INITIAL;
        }

        if let Err(e) = executor.set_stored_batch_statuses(statuses) {
            error(executor, format!("error storing the batch statuses: {e}"));
            return BToAStep::INITIAL;
        }
        if let Err(e) = executor.resolve_new_deposits_statuses(current.statuses.len()) {
            error(executor, format!("error resolving new deposits statuses: {e}"));
            return BToAStep::INITIAL;
        }
        info!(batch_id = current.id, "resolved batch statuses");

        BToAStep::ProposeSetStatusOnB
    }
}

/// Proposes the resolved statuses on Chain-B.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposeSetStatusOnB;

#[async_trait]
impl<E: BToAExecutor> Step<E> for ProposeSetStatusOnB {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::ProposeSetStatusOnB
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        let Some(batch) = executor.get_stored_batch() else {
            error(executor, "nil batch stored");
            return BToAStep::INITIAL;
        };

        if executor.process_max_retries_on_was_transfer_proposed_on_b() {
            error(executor, format!("max retries reached while proposing set status of batch {}", batch.id));
            return BToAStep::INITIAL;
        }

        match executor.was_set_status_proposed_on_b(cancel).await {
            Ok(true) => {
                info!(batch_id = batch.id, "set status already proposed on chain B");
                return BToAStep::SignProposedSetStatusOnB;
            }
            Ok(false) => {}
            Err(e) => {
                error(executor, format!("error determining if set status of batch {} was proposed: {e}", batch.id));
                return BToAStep::INITIAL;
            }
        }

        if !executor.my_turn_as_leader() {
            return <Self as Step<E>>::identifier(self);
        }

        if let Err(e) = executor.propose_set_status_on_b(cancel).await {
            error(executor, format!("error proposing set status of batch {}: {e}", batch.id));
            return BToAStep::INITIAL;
        }
        info!(batch_id = batch.id, "proposed set status on chain B");

        BToAStep::SignProposedSetStatusOnB
    }
}

/// Signs the status proposal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignProposedSetStatusOnB;

#[async_trait]
impl<E: BToAExecutor> Step<E> for SignProposedSetStatusOnB {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::SignProposedSetStatusOnB
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        if executor.get_stored_batch().is_none() {
            error(executor, "nil batch stored");
            return BToAStep::INITIAL;
        }

        let action_id = executor
            .get_and_store_action_id_for_propose_set_status_on_b(cancel)
            .await;

        match multisig::sign_action(executor, cancel, action_id).await {
            Verdict::Advance => BToAStep::WaitForQuorumOnSetStatus,
            Verdict::Stay => <Self as Step<E>>::identifier(self),
            Verdict::Reset => BToAStep::INITIAL,
        }
    }
}

/// Waits for the status proposal to gather a quorum of signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitForQuorumOnSetStatus;

#[async_trait]
impl<E: BToAExecutor> Step<E> for WaitForQuorumOnSetStatus {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::WaitForQuorumOnSetStatus
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        let action_id = executor.get_stored_action_id();

        match multisig::wait_for_quorum(executor, cancel, action_id).await {
            Verdict::Advance => BToAStep::PerformSetStatusOnB,
            Verdict::Stay => <Self as Step<E>>::identifier(self),
            Verdict::Reset => BToAStep::INITIAL,
        }
    }
}

/// Executes the status update once the quorum is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformSetStatusOnB;

#[async_trait]
impl<E: BToAExecutor> Step<E> for PerformSetStatusOnB {
    type Id = BToAStep;

    fn identifier(&self) -> BToAStep {
        BToAStep::PerformSetStatusOnB
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> BToAStep {
        let action_id = executor.get_stored_action_id();

        match multisig::perform_action(executor, cancel, action_id).await {
            Verdict::Advance | Verdict::Reset => BToAStep::INITIAL,
            Verdict::Stay => <Self as Step<E>>::identifier(self),
        }
    }
}
