//! The step implementations of the A→B state machine.

mod discovery;
mod proposal;

pub use discovery::GetPendingFromA;
pub use proposal::{PerformActionOnB, ProposeTransferOnB, SignProposedTransferOnB, WaitForQuorum};
