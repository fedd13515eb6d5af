//! Test utilities for the primitives.
//!
//! These live next to the types rather than in a shared crate to keep the primitives crate free of
//! dev-only dependencies on the rest of the workspace.

use primitive_types::U256;
use secp256k1::{rand::thread_rng, PublicKey, SecretKey, SECP256K1};

use crate::batch::{DepositTransfer, TransferBatch};

/// Generates a random secp256k1 key pair.
pub(crate) fn generate_keypair() -> (SecretKey, PublicKey) {
    SECP256K1.generate_keypair(&mut thread_rng())
}

/// A deposit with recognizable addresses and the given nonce and amount.
pub(crate) fn deposit(nonce: u64, amount: u64) -> DepositTransfer {
    DepositTransfer {
        nonce,
        to_bytes: vec![0x0a; 20],
        displayable_to: "to".to_string(),
        from_bytes: vec![0x0b; 32],
        displayable_from: "from".to_string(),
        token_bytes: b"token".to_vec(),
        converted_token_bytes: Vec::new(),
        displayable_token: "token".to_string(),
        amount: U256::from(amount),
    }
}

/// A batch holding one deposit per nonce, in the given order.
pub(crate) fn batch_with_nonces(id: u64, nonces: &[u64]) -> TransferBatch {
    TransferBatch::new(id, nonces.iter().map(|n| deposit(*n, 100)).collect())
}
