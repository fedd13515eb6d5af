//! The sign, quorum and perform phases of an action on Chain-B's multisig.
//!
//! Both directions end with an action on Chain-B (a transfer for A→B, a status update for B→A).
//! The phases only differ in which action id they act on and where they go next, so each step
//! calls one of these and maps the [`Verdict`] onto its own identifiers.

use bridge_relayer_primitives::types::{ActionId, INVALID_ACTION_ID};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::executor::{error, BaseExecutor};

/// What a multisig phase asks its step to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Go back to the first step of the direction.
    Reset,

    /// Run the same step again on the next tick.
    Stay,

    /// Move to the following phase.
    Advance,
}

/// Signs `action_id` unless this relayer already did.
pub(crate) async fn sign_action<E: BaseExecutor>(
    executor: &mut E,
    cancel: &CancellationToken,
    action_id: Result<ActionId, E::Error>,
) -> Verdict {
    let action_id = match action_id {
        Ok(INVALID_ACTION_ID) => {
            error(executor, "contract error, got invalid action ID");
            return Verdict::Reset;
        }
        Ok(id) => id,
        Err(e) => {
            error(executor, format!("error fetching action ID: {e}"));
            return Verdict::Reset;
        }
    };
    info!(%action_id, "fetched action ID");

    match executor.was_action_signed_on_b(cancel, action_id).await {
        Ok(true) => {
            info!(%action_id, "action already signed");
            return Verdict::Advance;
        }
        Ok(false) => {}
        Err(e) => {
            error(executor, format!("error determining if the action was signed: {e}"));
            return Verdict::Reset;
        }
    }

    if let Err(e) = executor.sign_action_on_b(cancel, action_id).await {
        error(executor, format!("error signing the action {action_id}: {e}"));
        return Verdict::Reset;
    }

    Verdict::Advance
}

/// Checks whether `action_id` gathered enough signatures, within the Chain-B retry budget.
pub(crate) async fn wait_for_quorum<E: BaseExecutor>(
    executor: &mut E,
    cancel: &CancellationToken,
    action_id: ActionId,
) -> Verdict {
    if executor.process_max_retries_on_b() {
        error(executor, format!("max retries reached while waiting for quorum on action {action_id}"));
        return Verdict::Reset;
    }

    match executor.process_quorum_reached_on_b(cancel, action_id).await {
        Ok(true) => {
            info!(%action_id, "quorum reached");
            Verdict::Advance
        }
        Ok(false) => Verdict::Stay,
        Err(e) => {
            error(executor, format!("error while checking the quorum on action {action_id}: {e}"));
            Verdict::Reset
        }
    }
}

/// Executes `action_id` if this relayer leads the round.
///
/// [`Verdict::Advance`] means the action is observed executed on chain. After a submission the
/// phase stays put; the next tick sees the inclusion.
pub(crate) async fn perform_action<E: BaseExecutor>(
    executor: &mut E,
    cancel: &CancellationToken,
    action_id: ActionId,
) -> Verdict {
    match executor.was_action_performed_on_b(cancel, action_id).await {
        Ok(true) => {
            info!(%action_id, "action performed");
            return Verdict::Advance;
        }
        Ok(false) => {}
        Err(e) => {
            error(executor, format!("error determining if the action was performed: {e}"));
            return Verdict::Reset;
        }
    }

    if !executor.my_turn_as_leader() {
        return Verdict::Stay;
    }

    if let Err(e) = executor.perform_action_on_b(cancel, action_id).await {
        error(executor, format!("error performing the action {action_id}: {e}"));
        return Verdict::Reset;
    }
    info!(%action_id, "action submitted");

    Verdict::Stay
}
