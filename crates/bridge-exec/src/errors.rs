//! Error types for the bridge executor and its collaborators.

use std::time::Duration;

use bridge_relayer_p2p_service::P2PError;
use bridge_relayer_primitives::errors::BatchError;
use primitive_types::U256;
use thiserror::Error;

/// Errors returned by the chain clients, the batch validator and the transaction executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The remote endpoint could not be reached or returned an error.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The remote endpoint answered something that cannot be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The account cannot cover the amount a batch moves.
    #[error("insufficient balance for token {token}: required {required}, available {available}")]
    InsufficientBalance {
        /// The token, hex encoded.
        token: String,

        /// The amount the batch needs.
        required: U256,

        /// The amount available.
        available: U256,
    },

    /// A submitted transaction was executed with a failure status.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// The client is not in a state where it can be used.
    #[error("client unavailable: {0}")]
    Unavailable(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors raised by the bridge executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// An operation needing the current batch was called before one was stored.
    #[error("nil batch")]
    NilBatch,

    /// Chain-A did not return the requested batch.
    #[error("batch not found: requested {requested}, got {got:?}")]
    BatchNotFound {
        /// The requested batch id.
        requested: u64,

        /// The id of the batch that was returned, if any.
        got: Option<u64>,
    },

    /// The stored batch is inconsistent, for instance its deposit nonces have a gap.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// A configured duration is below its minimum.
    #[error("invalid duration for {name}: {value:?}, minimum {min:?}")]
    InvalidDuration {
        /// The configuration field.
        name: &'static str,

        /// The configured value.
        value: Duration,

        /// The smallest accepted value.
        min: Duration,
    },

    /// A configured value is below its minimum.
    #[error("invalid value for {name}: {value}, minimum {min}")]
    InvalidValue {
        /// The configuration field.
        name: &'static str,

        /// The configured value.
        value: u64,

        /// The smallest accepted value.
        min: u64,
    },

    /// A chain reported a quorum that cannot be used.
    #[error("invalid quorum value: {0}")]
    InvalidQuorumValue(u64),

    /// Chain-B returned no action for the stored batch.
    #[error("invalid action ID")]
    InvalidActionId,

    /// A Chain-A call failed.
    #[error("chain A: {0}")]
    ChainA(#[source] ClientError),

    /// A Chain-B call failed.
    #[error("chain B: {0}")]
    ChainB(#[source] ClientError),

    /// The batch validator could not be reached.
    #[error("batch validator: {0}")]
    Validator(#[source] ClientError),

    /// The signature could not be shared with the other relayers.
    #[error("p2p: {0}")]
    P2P(#[from] P2PError),
}

/// Result alias for the executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
