//! Discovery of the next Chain-A batch.

use async_trait::async_trait;
use bridge_relayer_primitives::types::Direction;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    a_to_b::{executor::AToBExecutor, state::AToBStep},
    executor::{error, warn},
    step::Step,
};

/// Fetches the batch following the last one executed on Chain-B and checks it can be relayed.
///
/// Any failure keeps the machine here so the batch is fetched again on the next tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPendingFromA;

#[async_trait]
impl<E: AToBExecutor> Step<E> for GetPendingFromA {
    type Id = AToBStep;

    fn identifier(&self) -> AToBStep {
        AToBStep::GetPendingFromA
    }

    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> AToBStep {
        let stay = <Self as Step<E>>::identifier(self);

        if let Err(e) = executor.check_chain_b_client_availability(cancel).await {
            debug!(%e, "chain B client unavailable");
        }
        if let Err(e) = executor.check_chain_a_client_availability(cancel).await {
            debug!(%e, "chain A client unavailable");
        }

        executor.reset_retries_on_b();

        let last_executed = match executor.get_last_executed_a_batch_id_on_b(cancel).await {
            Ok(id) => id,
            Err(e) => {
                error(executor, format!("error fetching last executed chain A batch ID: {e}"));
                return stay;
            }
        };

        let next_id = last_executed.saturating_add(1);
        if let Err(e) = executor.get_and_store_batch_from_a(cancel, next_id).await {
            debug!(batch_id = next_id, %e, "cannot fetch chain A batch");
            return stay;
        }

        let Some(batch) = executor.get_stored_batch() else {
            debug!(batch_id = next_id, "no new batch found on chain A");
            return stay;
        };

        match executor.validate_batch(cancel, &batch).await {
            Ok(true) => {}
            Ok(false) => {
                warn(executor, format!("batch {} not valid", batch.id));
                return stay;
            }
            Err(e) => {
                error(executor, format!("error validating chain A batch {}: {e}", batch.id));
                return stay;
            }
        }

        if let Err(e) = executor.check_available_tokens(cancel, &batch, Direction::AToB).await {
            error(executor, format!("error checking available tokens for batch {}: {e}", batch.id));
            return stay;
        }

        info!(batch_id = batch.id, deposits = batch.deposits.len(), "fetched new batch from chain A");

        if let Err(e) = executor.verify_last_deposit_nonce_executed_on_a_batch(cancel).await {
            error(executor, format!("verification failed on the new batch {}: {e}", batch.id));
            return stay;
        }

        AToBStep::ProposeTransferOnB
    }
}
