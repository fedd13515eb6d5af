//! The unit of work of a state machine.

use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Names a step of a state machine.
///
/// Identifiers are plain enums; the [`Display`] form is only used in logs and metrics.
pub trait StepIdentifier: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> StepIdentifier for T where T: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {}

/// One state of a state machine.
///
/// A step holds no state of its own. Everything it needs goes through the executor `E`, and its
/// only output is the identifier of the step to run next.
#[async_trait]
pub trait Step<E: Send>: Debug + Send + Sync {
    /// The identifier type of the state machine this step belongs to.
    type Id: StepIdentifier;

    /// The identifier of this step.
    fn identifier(&self) -> Self::Id;

    /// Runs the step and returns the identifier of the next one.
    ///
    /// Errors are never returned: a step that fails logs the failure through the executor and
    /// picks the step to retry from.
    async fn execute(&self, executor: &mut E, cancel: &CancellationToken) -> Self::Id;
}
