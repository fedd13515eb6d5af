//! Errors of the role providers.

use bridge_relayer_primitives::errors::{CryptoError, RelayerSetError};
use thiserror::Error;

/// Errors raised while checking relayers against the whitelists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleProviderError {
    /// The recovered signer is not a whitelisted Chain-A relayer.
    #[error("address {0} is not whitelisted")]
    AddressNotWhitelisted(String),

    /// The signature is malformed or does not match the hash.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    /// The fetched relayer list cannot be used.
    #[error("invalid relayer set: {0}")]
    InvalidRelayerSet(#[from] RelayerSetError),
}
