//! Operations specific to the B→A direction.

use async_trait::async_trait;
use bridge_relayer_primitives::{
    batch::{DepositStatus, TransferBatch},
    types::ActionId,
};
use tokio_util::sync::CancellationToken;

use crate::executor::BaseExecutor;

/// The executor the B→A steps run against.
#[async_trait]
pub trait BToAExecutor: BaseExecutor {
    /// The batch Chain-B currently wants relayed, if any.
    async fn get_batch_from_b(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<TransferBatch>, Self::Error>;

    /// Replaces the stored batch. Fails on `None`.
    fn store_batch_from_b(&mut self, batch: Option<TransferBatch>) -> Result<(), Self::Error>;

    /// Whether the stored batch was already executed on Chain-A.
    async fn was_transfer_performed_on_a(
        &self,
        cancel: &CancellationToken,
    ) -> Result<bool, Self::Error>;

    /// Signs the stored batch for Chain-A and broadcasts the signature to the other relayers.
    async fn sign_transfer_on_a(&mut self, cancel: &CancellationToken) -> Result<(), Self::Error>;

    /// Whether enough relayer signatures were collected for the stored batch.
    async fn process_quorum_reached_on_a(
        &self,
        cancel: &CancellationToken,
    ) -> Result<bool, Self::Error>;

    /// Submits the stored batch on Chain-A with the collected signatures.
    async fn perform_transfer_on_a(&mut self, cancel: &CancellationToken)
        -> Result<(), Self::Error>;

    /// Waits for the submitted transfer to be executed, or for `cancel`.
    async fn wait_for_transfer_confirmation(&self, cancel: &CancellationToken);

    /// Polls Chain-A for the statuses of the stored batch. Empty if none showed up in time.
    async fn wait_and_return_final_batch_statuses(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<DepositStatus>;

    /// The statuses Chain-A recorded for the stored batch.
    async fn get_batch_statuses_from_a(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DepositStatus>, Self::Error>;

    /// Overwrites the statuses of the stored batch.
    fn set_stored_batch_statuses(&mut self, statuses: Vec<DepositStatus>)
        -> Result<(), Self::Error>;

    /// Resizes the statuses of the stored batch to `num_deposits`, rejecting the new entries.
    fn resolve_new_deposits_statuses(&mut self, num_deposits: usize) -> Result<(), Self::Error>;

    /// Drops every relayer signature collected for Chain-A.
    fn clear_stored_p2p_signatures_for_a(&self);

    /// Whether the statuses of the stored batch were already proposed on Chain-B.
    async fn was_set_status_proposed_on_b(
        &self,
        cancel: &CancellationToken,
    ) -> Result<bool, Self::Error>;

    /// Proposes the statuses of the stored batch on Chain-B.
    async fn propose_set_status_on_b(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), Self::Error>;

    /// Queries and stores the action id of the status proposal.
    async fn get_and_store_action_id_for_propose_set_status_on_b(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<ActionId, Self::Error>;

    /// Counts one more wait on Chain-A and tells whether the limit was reached.
    fn process_max_retries_on_a(&mut self) -> bool;

    /// Resets the Chain-A wait counter.
    fn reset_retries_on_a(&mut self);

    /// Counts one more status proposal check and tells whether the limit was reached.
    fn process_max_retries_on_was_transfer_proposed_on_b(&mut self) -> bool;

    /// Resets the status proposal counter.
    fn reset_retries_on_was_transfer_proposed_on_b(&mut self);
}
