//! The state machine relaying batches from Chain-B to Chain-A.
//!
//! The batch is signed off-chain by every relayer and submitted once on Chain-A. The deposit
//! statuses Chain-A produced are then written back on Chain-B through its multisig.

pub mod executor;
pub mod state;
pub mod transitions;

#[cfg(test)]
mod tests;

use self::{executor::BToAExecutor, state::BToAStep, transitions::*};
use crate::{
    errors::StateMachineError,
    state_machine::{BoxedStep, StateMachine},
};

/// The B→A state machine over executor `E`.
pub type BToAStateMachine<E> = StateMachine<BToAStep, E>;

/// Every step of the B→A direction.
pub fn steps<E: BToAExecutor + 'static>() -> Vec<BoxedStep<BToAStep, E>> {
    vec![
        Box::new(GetPendingFromB),
        Box::new(SignProposedTransferOnA),
        Box::new(WaitForQuorumOnTransfer),
        Box::new(PerformTransfer),
        Box::new(WaitTransferConfirmation),
        Box::new(ResolveSetStatus),
        Box::new(ProposeSetStatusOnB),
        Box::new(SignProposedSetStatusOnB),
        Box::new(WaitForQuorumOnSetStatus),
        Box::new(PerformSetStatusOnB),
    ]
}

/// Creates the B→A state machine, starting from [`BToAStep::INITIAL`].
pub fn create_state_machine<E: BToAExecutor + 'static>(
    name: impl Into<String>,
    executor: E,
) -> Result<BToAStateMachine<E>, StateMachineError> {
    StateMachine::new(name, executor, steps(), BToAStep::INITIAL)
}
