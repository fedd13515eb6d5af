//! Transfer batches and the deposits they carry.

use std::{collections::BTreeMap, fmt};

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::BatchError;

/// The outcome of a single deposit once its batch was executed on the destination chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum DepositStatus {
    /// The deposit was not resolved yet.
    #[default]
    Unresolved = 0,

    /// The deposit was transferred on the destination chain.
    Executed = 3,

    /// The deposit was refused and will be refunded on the source chain.
    Rejected = 4,
}

impl From<DepositStatus> for u8 {
    fn from(value: DepositStatus) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for DepositStatus {
    type Error = BatchError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unresolved),
            3 => Ok(Self::Executed),
            4 => Ok(Self::Rejected),
            other => Err(BatchError::UnknownStatus(other)),
        }
    }
}

/// Converts raw status bytes, as reported by a chain, into typed statuses.
pub fn statuses_from_bytes(bytes: &[u8]) -> Result<Vec<DepositStatus>, BatchError> {
    bytes.iter().copied().map(DepositStatus::try_from).collect()
}

/// A single user transfer inside a batch.
///
/// The displayable fields are only used for logging and are never part of any signed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositTransfer {
    /// The per-deposit nonce, gap-free inside a batch.
    pub nonce: u64,

    /// Recipient on the destination chain.
    #[serde(with = "hex::serde")]
    pub to_bytes: Vec<u8>,

    /// Human readable recipient.
    #[serde(default)]
    pub displayable_to: String,

    /// Sender on the source chain.
    #[serde(with = "hex::serde")]
    pub from_bytes: Vec<u8>,

    /// Human readable sender.
    #[serde(default)]
    pub displayable_from: String,

    /// Token identifier on the source chain.
    #[serde(with = "hex::serde")]
    pub token_bytes: Vec<u8>,

    /// Token identifier on the destination chain, filled in by the source client.
    #[serde(with = "hex::serde", default)]
    pub converted_token_bytes: Vec<u8>,

    /// Human readable token identifier.
    #[serde(default)]
    pub displayable_token: String,

    /// The transferred amount.
    pub amount: U256,
}

impl fmt::Display for DepositTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "to: {}, from: {}, token address: {}, amount: {}, deposit nonce: {}",
            self.displayable_to, self.displayable_from, self.displayable_token, self.amount, self.nonce
        )
    }
}

/// An ordered group of deposits addressed by a single batch id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBatch {
    /// The batch id as reported by the source chain.
    pub id: u64,

    /// The deposits, ordered by nonce.
    pub deposits: Vec<DepositTransfer>,

    /// One status per deposit, once they are known.
    #[serde(default)]
    pub statuses: Vec<DepositStatus>,
}

impl TransferBatch {
    /// Creates a batch whose statuses are all unresolved.
    pub fn new(id: u64, deposits: Vec<DepositTransfer>) -> Self {
        let statuses = vec![DepositStatus::Unresolved; deposits.len()];
        Self {
            id,
            deposits,
            statuses,
        }
    }

    /// Whether the batch carries no deposit.
    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    /// Checks that the deposit nonces start right after `last_executed_nonce` and have no gap.
    pub fn verify_deposit_nonces(&self, last_executed_nonce: u64) -> Result<(), BatchError> {
        let mut expected = last_executed_nonce;
        for (index, deposit) in self.deposits.iter().enumerate() {
            expected = expected.wrapping_add(1);
            if deposit.nonce != expected {
                return Err(BatchError::InvalidDepositNonce {
                    index,
                    expected,
                    found: deposit.nonce,
                });
            }
        }

        Ok(())
    }

    /// Replaces the statuses, which must match the deposits one to one.
    pub fn set_statuses(&mut self, statuses: Vec<DepositStatus>) -> Result<(), BatchError> {
        if statuses.len() != self.deposits.len() {
            return Err(BatchError::StatusesLengthMismatch {
                statuses: statuses.len(),
                deposits: self.deposits.len(),
            });
        }

        self.statuses = statuses;
        Ok(())
    }

    /// Reconciles the statuses with the number of deposits the source chain now reports.
    ///
    /// Every status at or past `new_num_deposits` becomes [`DepositStatus::Rejected`] and missing
    /// entries are appended as rejected.
    pub fn resolve_new_deposits(&mut self, new_num_deposits: usize) {
        let old_len = self.statuses.len();
        if new_num_deposits == old_len {
            debug!(len_statuses = old_len, "num statuses ok");
            return;
        }

        for status in self.statuses.iter_mut().skip(new_num_deposits) {
            *status = DepositStatus::Rejected;
        }
        if new_num_deposits > old_len {
            self.statuses.resize(new_num_deposits, DepositStatus::Rejected);
        }

        warn!(
            len_statuses = old_len,
            %new_num_deposits,
            "recovered num statuses"
        );
    }

    /// Sums the amounts per destination token.
    ///
    /// Deposits whose destination token was not filled in are grouped under the source token.
    pub fn cumulated_amounts(&self) -> BTreeMap<Vec<u8>, U256> {
        let mut totals = BTreeMap::<Vec<u8>, U256>::new();
        for deposit in &self.deposits {
            let token = if deposit.converted_token_bytes.is_empty() {
                &deposit.token_bytes
            } else {
                &deposit.converted_token_bytes
            };

            let total = totals.entry(token.clone()).or_default();
            *total = total.saturating_add(deposit.amount);
        }

        totals
    }

    /// Counts the statuses equal to `status`.
    pub fn count_statuses(&self, status: DepositStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }
}

impl fmt::Display for TransferBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Batch id {}:", self.id)?;
        for deposit in &self.deposits {
            write!(f, "\n  {deposit}")?;
        }

        let statuses: Vec<u8> = self.statuses.iter().copied().map(u8::from).collect();
        write!(f, "\nStatuses: {}", hex::encode(statuses))
    }
}
