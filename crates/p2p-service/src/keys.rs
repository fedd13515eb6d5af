//! The relayer identity key.
//!
//! A relayer signs its envelopes with a secp256k1 key. The same key backs its libp2p identity so
//! the peer id and the whitelisted public key always refer to the same relayer.

use std::fmt;

use bridge_relayer_primitives::types::RelayerPubKey;
use libp2p::identity;
use secp256k1::{ecdsa::Signature, rand::thread_rng, Message, PublicKey, SecretKey, SECP256K1};
use sha2::{Digest, Sha256};

use crate::errors::P2PError;

/// The secp256k1 key pair of a relayer.
#[derive(Clone)]
pub struct RelayerKeypair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl fmt::Debug for RelayerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayerKeypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl RelayerKeypair {
    /// Wraps an existing secret key.
    pub fn new(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Parses a 32-byte secret key.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, secp256k1::Error> {
        Ok(Self::new(SecretKey::from_slice(bytes)?))
    }

    /// Generates a random key pair.
    pub fn generate() -> Self {
        Self::new(SecretKey::new(&mut thread_rng()))
    }

    /// The secret key.
    pub const fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// The public key.
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// The compressed public key, as whitelisted by the other relayers.
    pub fn relayer_pubkey(&self) -> RelayerPubKey {
        RelayerPubKey::from(self.public_key.serialize().to_vec())
    }

    /// Signs `data` with a compact ECDSA signature over its SHA-256 digest.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let message = Message::from_digest(Sha256::digest(data).into());
        SECP256K1
            .sign_ecdsa(&message, &self.secret_key)
            .serialize_compact()
            .to_vec()
    }

    /// The libp2p identity derived from the same secret.
    pub fn to_libp2p_keypair(&self) -> Result<identity::Keypair, identity::DecodingError> {
        let secret =
            identity::secp256k1::SecretKey::try_from_bytes(self.secret_key.secret_bytes())?;
        Ok(identity::secp256k1::Keypair::from(secret).into())
    }
}

/// Verifies a signature produced by [`RelayerKeypair::sign`].
pub fn verify_signature(
    public_key_bytes: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<(), P2PError> {
    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| P2PError::InvalidPublicKey(e.to_string()))?;
    let signature = Signature::from_compact(signature).map_err(|_| P2PError::InvalidSignature)?;
    let message = Message::from_digest(Sha256::digest(data).into());

    SECP256K1
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| P2PError::InvalidSignature)
}
