//! The state machine relaying batches from Chain-A to Chain-B.
//!
//! A batch is discovered on Chain-A, then proposed, signed and executed through Chain-B's
//! multisig:
//!
//! ```text
//! GetPendingFromA -> ProposeTransferOnB -> SignProposedTransferOnB -> WaitForQuorum
//!        ^                                                                  |
//!        +------------------------ PerformActionOnB <-----------------------+
//! ```

pub mod executor;
pub mod state;
pub mod transitions;

#[cfg(test)]
mod tests;

use self::{
    executor::AToBExecutor,
    state::AToBStep,
    transitions::{
        GetPendingFromA, PerformActionOnB, ProposeTransferOnB, SignProposedTransferOnB,
        WaitForQuorum,
    },
};
use crate::{
    errors::StateMachineError,
    state_machine::{BoxedStep, StateMachine},
};

/// The A→B state machine over executor `E`.
pub type AToBStateMachine<E> = StateMachine<AToBStep, E>;

/// Every step of the A→B direction.
pub fn steps<E: AToBExecutor + 'static>() -> Vec<BoxedStep<AToBStep, E>> {
    vec![
        Box::new(GetPendingFromA),
        Box::new(ProposeTransferOnB),
        Box::new(SignProposedTransferOnB),
        Box::new(WaitForQuorum),
        Box::new(PerformActionOnB),
    ]
}

/// Creates the A→B state machine, starting from [`AToBStep::INITIAL`].
pub fn create_state_machine<E: AToBExecutor + 'static>(
    name: impl Into<String>,
    executor: E,
) -> Result<AToBStateMachine<E>, StateMachineError> {
    StateMachine::new(name, executor, steps(), AToBStep::INITIAL)
}
