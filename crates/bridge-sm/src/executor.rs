//! Operations shared by the executors of both bridge directions.

use async_trait::async_trait;
use bridge_relayer_primitives::{
    batch::TransferBatch,
    types::{ActionId, Direction},
};
use tokio_util::sync::CancellationToken;

/// The operations every step can rely on, whatever the direction.
///
/// Implementations hold the batch currently being relayed, the retry counters and the chain
/// clients. Steps never see an error beyond its [`Display`](std::fmt::Display) form: they log it
/// through [`BaseExecutor::print_info`] and decide which step to go back to.
#[async_trait]
pub trait BaseExecutor: Send + Sync {
    /// The error returned by the fallible operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Logs a message on behalf of a step.
    ///
    /// Warnings and errors are also recorded as the last error of the direction.
    fn print_info(&self, level: tracing::Level, message: &str);

    /// Whether this relayer is the leader of the current time slot.
    fn my_turn_as_leader(&self) -> bool;

    /// A copy of the batch currently being relayed, if any.
    fn get_stored_batch(&self) -> Option<TransferBatch>;

    /// The Chain-B action the current batch is waiting on.
    fn get_stored_action_id(&self) -> ActionId;

    /// Fails if Chain-A cannot be used right now.
    async fn check_chain_a_client_availability(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), Self::Error>;

    /// Fails if Chain-B cannot be used right now.
    async fn check_chain_b_client_availability(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), Self::Error>;

    /// Asks the external validator whether `batch` may be relayed.
    async fn validate_batch(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> Result<bool, Self::Error>;

    /// Fails if the destination of `direction` cannot cover the amounts in `batch`.
    async fn check_available_tokens(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
        direction: Direction,
    ) -> Result<(), Self::Error>;

    /// Whether this relayer already signed `action_id` on Chain-B.
    async fn was_action_signed_on_b(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<bool, Self::Error>;

    /// Signs `action_id` on Chain-B.
    async fn sign_action_on_b(
        &mut self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<(), Self::Error>;

    /// Whether `action_id` gathered enough signatures on Chain-B.
    async fn process_quorum_reached_on_b(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<bool, Self::Error>;

    /// Whether `action_id` was already executed on Chain-B.
    async fn was_action_performed_on_b(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<bool, Self::Error>;

    /// Executes `action_id` on Chain-B.
    async fn perform_action_on_b(
        &mut self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> Result<(), Self::Error>;

    /// Counts one more wait on Chain-B and tells whether the limit was reached.
    fn process_max_retries_on_b(&mut self) -> bool;

    /// Resets the Chain-B wait counter.
    fn reset_retries_on_b(&mut self);
}

/// Logs at `WARN` through the executor.
pub(crate) fn warn<E: BaseExecutor + ?Sized>(executor: &E, message: impl AsRef<str>) {
    executor.print_info(tracing::Level::WARN, message.as_ref());
}

/// Logs at `ERROR` through the executor.
pub(crate) fn error<E: BaseExecutor + ?Sized>(executor: &E, message: impl AsRef<str>) {
    executor.print_info(tracing::Level::ERROR, message.as_ref());
}
