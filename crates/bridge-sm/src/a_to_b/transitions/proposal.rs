//! Moving the discovered batch through Chain-B's multisig.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    a_to_b::{executor::AToBExecutor, state::AToBStep},
    executor::error,
    multisig::{self, Verdict},
    step::Step,
};

/// Proposes the stored batch on Chain-B.
///
/// Only the leader proposes. Other relayers stay here until they observe the proposal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposeTransferOnB;

#[async_trait]
impl<E: AToBExecutor> Step<E> for ProposeTransferOnB {
    type Id = AToBStep;

    fn identifier(&self) -> AToBStep {
        AToBStep::ProposeTransferOnB
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> AToBStep {
        let Some(batch) = executor.get_stored_batch() else {
            error(executor, "nil batch stored");
            return AToBStep::INITIAL;
        };

        match executor.was_transfer_proposed_on_b(cancel).await {
            Ok(true) => {
                info!(batch_id = batch.id, "transfer already proposed on chain B");
                return AToBStep::SignProposedTransferOnB;
            }
            Ok(false) => {}
            Err(e) => {
                error(executor, format!("error determining if the batch {} was proposed: {e}", batch.id));
                return AToBStep::INITIAL;
            }
        }

        if !executor.my_turn_as_leader() {
            return <Self as Step<E>>::identifier(self);
        }

        if let Err(e) = executor.propose_transfer_on_b(cancel).await {
            error(executor, format!("error proposing transfer of batch {}: {e}", batch.id));
            return AToBStep::INITIAL;
        }
        info!(batch_id = batch.id, "proposed transfer on chain B");

        AToBStep::SignProposedTransferOnB
    }
}

/// Signs the transfer proposal of the stored batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignProposedTransferOnB;

#[async_trait]
impl<E: AToBExecutor> Step<E> for SignProposedTransferOnB {
    type Id = AToBStep;

    fn identifier(&self) -> AToBStep {
        AToBStep::SignProposedTransferOnB
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> AToBStep {
        if executor.get_stored_batch().is_none() {
            error(executor, "nil batch stored");
            return AToBStep::INITIAL;
        }

        let action_id = executor
            .get_and_store_action_id_for_propose_transfer_on_b(cancel)
            .await;

        match multisig::sign_action(executor, cancel, action_id).await {
            Verdict::Advance => AToBStep::WaitForQuorum,
            Verdict::Stay => <Self as Step<E>>::identifier(self),
            Verdict::Reset => AToBStep::INITIAL,
        }
    }
}

/// Waits for the transfer proposal to gather a quorum of signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitForQuorum;

#[async_trait]
impl<E: AToBExecutor> Step<E> for WaitForQuorum {
    type Id = AToBStep;

    fn identifier(&self) -> AToBStep {
        AToBStep::WaitForQuorum
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> AToBStep {
        let action_id = executor.get_stored_action_id();

        match multisig::wait_for_quorum(executor, cancel, action_id).await {
            Verdict::Advance => AToBStep::PerformActionOnB,
            Verdict::Stay => <Self as Step<E>>::identifier(self),
            Verdict::Reset => AToBStep::INITIAL,
        }
    }
}

/// Executes the transfer once the quorum is reached.
///
/// Goes back to discovery once the action is seen executed on chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformActionOnB;

#[async_trait]
impl<E: AToBExecutor> Step<E> for PerformActionOnB {
    type Id = AToBStep;

    fn identifier(&self) -> AToBStep {
        AToBStep::PerformActionOnB
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> AToBStep {
        let action_id = executor.get_stored_action_id();

        match multisig::perform_action(executor, cancel, action_id).await {
            Verdict::Advance | Verdict::Reset => AToBStep::INITIAL,
            Verdict::Stay => <Self as Step<E>>::identifier(self),
        }
    }
}
