//! Errors raised while building or driving a state machine.

use thiserror::Error;

/// Errors that can occur in a state machine.
///
/// All of them are configuration errors: a correctly wired state machine never returns one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    /// The state machine was built without any step.
    #[error("no steps provided")]
    NoSteps,

    /// Two steps share the same identifier.
    #[error("duplicated step identifier {0}")]
    DuplicatedStepIdentifier(String),

    /// A step returned, or the state machine started at, an identifier with no registered step.
    #[error("step {0} not found")]
    StepNotFound(String),

    /// The interval between two steps is zero.
    #[error("invalid step interval")]
    InvalidStepInterval,
}
