//! The step implementations of the B→A state machine.

mod set_status;
mod transfer;

pub use set_status::{
    PerformSetStatusOnB, ProposeSetStatusOnB, ResolveSetStatus, SignProposedSetStatusOnB,
    WaitForQuorumOnSetStatus,
};
pub use transfer::{
    GetPendingFromB, PerformTransfer, SignProposedTransferOnA, WaitForQuorumOnTransfer,
    WaitTransferConfirmation,
};
