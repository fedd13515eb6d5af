//! Operations specific to the A→B direction.

use async_trait::async_trait;
use bridge_relayer_primitives::types::ActionId;
use tokio_util::sync::CancellationToken;

use crate::executor::BaseExecutor;

/// The executor the A→B steps run against.
#[async_trait]
pub trait AToBExecutor: BaseExecutor {
    /// The id of the last Chain-A batch executed on Chain-B.
    async fn get_last_executed_a_batch_id_on_b(
        &self,
        cancel: &CancellationToken,
    ) -> Result<u64, Self::Error>;

    /// Fetches the Chain-A batch with id `nonce` and stores it.
    ///
    /// Fails if Chain-A returns a batch with another id or without deposits.
    async fn get_and_store_batch_from_a(
        &mut self,
        cancel: &CancellationToken,
        nonce: u64,
    ) -> Result<(), Self::Error>;

    /// Fails unless the stored batch continues the deposits already executed on Chain-B.
    async fn verify_last_deposit_nonce_executed_on_a_batch(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), Self::Error>;

    /// Whether the stored batch was already proposed on Chain-B.
    async fn was_transfer_proposed_on_b(
        &self,
        cancel: &CancellationToken,
    ) -> Result<bool, Self::Error>;

    /// Proposes the stored batch on Chain-B.
    async fn propose_transfer_on_b(&mut self, cancel: &CancellationToken)
        -> Result<(), Self::Error>;

    /// Queries and stores the action id of the stored batch's transfer proposal.
    async fn get_and_store_action_id_for_propose_transfer_on_b(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<ActionId, Self::Error>;
}
