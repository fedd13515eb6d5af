//! The steps of the B→A state machine.

use std::fmt::{self, Display};

/// Identifies a step of the B→A state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BToAStep {
    /// Looks for the pending batch on Chain-B.
    GetPendingFromB,

    /// Signs the batch for Chain-A and broadcasts the signature.
    SignProposedTransferOnA,

    /// Waits until enough relayer signatures were collected.
    WaitForQuorumOnTransfer,

    /// Submits the transfer on Chain-A.
    PerformTransfer,

    /// Gives the submitted transfer time to be executed.
    WaitTransferConfirmation,

    /// Reads the deposit statuses produced by the transfer.
    ResolveSetStatus,

    /// Proposes the statuses on Chain-B's multisig.
    ProposeSetStatusOnB,

    /// Signs the status proposal.
    SignProposedSetStatusOnB,

    /// Waits until enough relayers signed the status proposal.
    WaitForQuorumOnSetStatus,

    /// Executes the status update on Chain-B.
    PerformSetStatusOnB,
}

impl BToAStep {
    /// Every step, in order.
    pub const ALL: [Self; 10] = [
        Self::GetPendingFromB,
        Self::SignProposedTransferOnA,
        Self::WaitForQuorumOnTransfer,
        Self::PerformTransfer,
        Self::WaitTransferConfirmation,
        Self::ResolveSetStatus,
        Self::ProposeSetStatusOnB,
        Self::SignProposedSetStatusOnB,
        Self::WaitForQuorumOnSetStatus,
        Self::PerformSetStatusOnB,
    ];

    /// The step every batch starts from.
    pub const INITIAL: Self = Self::GetPendingFromB;
}

impl Display for BToAStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetPendingFromB => "get pending batch from chain B",
            Self::SignProposedTransferOnA => "sign proposed transfer",
            Self::WaitForQuorumOnTransfer => "wait for quorum on transfer",
            Self::PerformTransfer => "perform transfer",
            Self::WaitTransferConfirmation => "wait transfer confirmation",
            Self::ResolveSetStatus => "resolve set status",
            Self::ProposeSetStatusOnB => "propose set status",
            Self::SignProposedSetStatusOnB => "sign proposed set status",
            Self::WaitForQuorumOnSetStatus => "wait for quorum on set status",
            Self::PerformSetStatusOnB => "perform set status",
        };

        f.write_str(name)
    }
}
