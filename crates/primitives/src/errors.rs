//! Errors returned by the primitive types.

use thiserror::Error;

/// Errors raised while checking the consistency of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// A deposit nonce does not follow the previous one.
    #[error("invalid deposit nonce at index {index}: expected {expected}, found {found}")]
    InvalidDepositNonce {
        /// The position of the offending deposit.
        index: usize,

        /// The nonce the deposit should have carried.
        expected: u64,

        /// The nonce the deposit actually carries.
        found: u64,
    },

    /// The statuses do not match the deposits one to one.
    #[error("statuses length {statuses} does not match the number of deposits {deposits}")]
    StatusesLengthMismatch {
        /// Number of statuses.
        statuses: usize,

        /// Number of deposits.
        deposits: usize,
    },

    /// A status byte has no known meaning.
    #[error("unknown deposit status {0}")]
    UnknownStatus(u8),
}

/// Errors raised by the Chain-A signature helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The signature does not have the expected size.
    #[error("invalid signature length: expected {expected}, got {got}")]
    InvalidSignatureLength {
        /// The expected length in bytes.
        expected: usize,

        /// The length that was provided.
        got: usize,
    },

    /// The recovery byte of a signature is out of range.
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    /// The underlying curve library rejected the input.
    #[error("secp256k1: {0}")]
    Secp256k1(#[from] secp256k1::Error),
}

/// Errors raised while decoding cross-chain call data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallDataError {
    /// The buffer does not even contain the protocol marker.
    #[error("call data too short for protocol indicator")]
    MissingMarker,

    /// The protocol marker is not one of the known values.
    #[error("call data unexpected protocol indicator: {0}")]
    UnexpectedMarker(u8),

    /// The buffer ended while reading the named field.
    #[error("call data too short while reading {0}")]
    TooShort(&'static str),

    /// The gas limit is declared wider than eight bytes.
    #[error("call data gas limit length {0} exceeds 8 bytes")]
    GasLimitTooLong(u64),
}

/// Errors raised when building a relayer set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayerSetError {
    /// The same key was listed twice.
    #[error("duplicated relayer public key {0}")]
    DuplicatedKey(String),

    /// The set would be empty.
    #[error("empty relayer set")]
    Empty,
}
