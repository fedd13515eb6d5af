//! The steps of the A→B state machine.

use std::fmt::{self, Display};

/// Identifies a step of the A→B state machine.
///
/// Variants are declared in the order a batch goes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AToBStep {
    /// Looks for the next batch on Chain-A and checks it.
    GetPendingFromA,

    /// Proposes the batch on Chain-B's multisig.
    ProposeTransferOnB,

    /// Signs the proposed transfer.
    SignProposedTransferOnB,

    /// Waits until enough relayers signed the transfer.
    WaitForQuorum,

    /// Executes the transfer on Chain-B.
    PerformActionOnB,
}

impl AToBStep {
    /// Every step, in order.
    pub const ALL: [Self; 5] = [
        Self::GetPendingFromA,
        Self::ProposeTransferOnB,
        Self::SignProposedTransferOnB,
        Self::WaitForQuorum,
        Self::PerformActionOnB,
    ];

    /// The step every batch starts from.
    pub const INITIAL: Self = Self::GetPendingFromA;
}

impl Display for AToBStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetPendingFromA => "get pending batch from chain A",
            Self::ProposeTransferOnB => "propose transfer",
            Self::SignProposedTransferOnB => "sign proposed transfer",
            Self::WaitForQuorum => "wait for quorum",
            Self::PerformActionOnB => "perform action",
        };

        f.write_str(name)
    }
}
