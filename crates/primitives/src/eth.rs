//! Chain-A hashing and signature helpers.
//!
//! Chain-A is an EVM chain: hashes are Keccak-256, addresses are the last 20 bytes of the hash of
//! the uncompressed public key and off-chain signatures are 65-byte recoverable secp256k1
//! signatures (`r || s || v`).

use primitive_types::U256;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId, Signature},
    Message, PublicKey, SecretKey, SECP256K1,
};
use sha3::{Digest, Keccak256};

use crate::{
    batch::TransferBatch,
    errors::CryptoError,
    types::{EthAddress, MessageHash},
};

/// Prefix prepended to a 32-byte hash before it is signed off-chain.
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Tag appended to the batch encoding so the hash cannot be replayed for another call.
pub const EXECUTE_BATCHED_TRANSFER_TAG: &str = "ExecuteBatchedTransfer";

/// Size of a recoverable signature.
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// Size of a compact signature.
pub const COMPACT_SIGNATURE_LEN: usize = 64;

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Hash actually signed for a 32-byte `hash`, with the signed message prefix.
pub fn eth_signed_message_hash(hash: &[u8; 32]) -> MessageHash {
    let mut hasher = Keccak256::new();
    hasher.update(ETH_SIGNED_MESSAGE_PREFIX);
    hasher.update(hash);
    MessageHash::new(hasher.finalize().into())
}

/// Canonical digest of a batch, signed by every relayer before the transfer is executed on
/// Chain-A.
///
/// The encoding is the concatenation of 32-byte words: the recipients, then the destination tokens,
/// the amounts, the deposit nonces, the batch id and finally the call tag.
pub fn batch_message_hash(batch: &TransferBatch) -> MessageHash {
    let mut hasher = Keccak256::new();
    for deposit in &batch.deposits {
        hasher.update(left_pad_32(&deposit.to_bytes));
    }
    for deposit in &batch.deposits {
        hasher.update(left_pad_32(&deposit.converted_token_bytes));
    }
    for deposit in &batch.deposits {
        hasher.update(u256_word(deposit.amount));
    }
    for deposit in &batch.deposits {
        hasher.update(u256_word(U256::from(deposit.nonce)));
    }
    hasher.update(u256_word(U256::from(batch.id)));
    hasher.update(EXECUTE_BATCHED_TRANSFER_TAG.as_bytes());

    eth_signed_message_hash(&hasher.finalize().into())
}

fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn left_pad_32(bytes: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    let bytes = &bytes[bytes.len().saturating_sub(32)..];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    word
}

/// The Chain-A address controlled by `public_key`.
pub fn address_from_public_key(public_key: &PublicKey) -> EthAddress {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    EthAddress::new(address)
}

/// Signs `hash` and returns the 65-byte `r || s || v` signature, with `v` in `{0, 1}`.
pub fn sign_hash(secret_key: &SecretKey, hash: &MessageHash) -> [u8; RECOVERABLE_SIGNATURE_LEN] {
    let message = Message::from_digest(hash.to_bytes());
    let (recovery_id, compact) = SECP256K1
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut signature = [0u8; RECOVERABLE_SIGNATURE_LEN];
    signature[..COMPACT_SIGNATURE_LEN].copy_from_slice(&compact);
    // recovery ids are always in 0..=3
    signature[COMPACT_SIGNATURE_LEN] = recovery_id.to_i32() as u8;
    signature
}

/// Recovers the public key that produced `signature` over `hash`.
///
/// Both the raw (`0`/`1`) and the legacy (`27`/`28`) recovery byte encodings are accepted.
pub fn recover_public_key(signature: &[u8], hash: &MessageHash) -> Result<PublicKey, CryptoError> {
    if signature.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignatureLength {
            expected: RECOVERABLE_SIGNATURE_LEN,
            got: signature.len(),
        });
    }

    let v = signature[COMPACT_SIGNATURE_LEN];
    let normalized = if v >= 27 { v - 27 } else { v };
    let recovery_id =
        RecoveryId::from_i32(normalized as i32).map_err(|_| CryptoError::InvalidRecoveryId(v))?;

    let recoverable =
        RecoverableSignature::from_compact(&signature[..COMPACT_SIGNATURE_LEN], recovery_id)?;
    let message = Message::from_digest(hash.to_bytes());

    Ok(SECP256K1.recover_ecdsa(&message, &recoverable)?)
}

/// Verifies the compact part of `signature` over `hash` against `public_key`.
pub fn verify_signature(
    public_key: &PublicKey,
    hash: &MessageHash,
    signature: &[u8],
) -> Result<(), CryptoError> {
    if signature.len() < COMPACT_SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignatureLength {
            expected: COMPACT_SIGNATURE_LEN,
            got: signature.len(),
        });
    }

    let compact = Signature::from_compact(&signature[..COMPACT_SIGNATURE_LEN])?;
    let message = Message::from_digest(hash.to_bytes());

    Ok(SECP256K1.verify_ecdsa(&message, &compact, public_key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{batch_with_nonces, generate_keypair};

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn address_of_known_key() {
        // secret key 0x...01 controls the well known generator address
        let mut sk_bytes = [0u8; 32];
        sk_bytes[31] = 1;
        let sk = SecretKey::from_slice(&sk_bytes).unwrap();
        let pk = PublicKey::from_secret_key(SECP256K1, &sk);

        assert_eq!(
            address_from_public_key(&pk).to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn signature_recovers_signer() {
        let (sk, pk) = generate_keypair();
        let hash = batch_message_hash(&batch_with_nonces(3, &[1, 2]));

        let signature = sign_hash(&sk, &hash);
        assert_eq!(recover_public_key(&signature, &hash).unwrap(), pk);
        verify_signature(&pk, &hash, &signature).unwrap();
    }

    #[test]
    fn legacy_recovery_byte_is_accepted() {
        let (sk, pk) = generate_keypair();
        let hash = MessageHash::new([9; 32]);

        let mut signature = sign_hash(&sk, &hash);
        signature[64] += 27;
        assert_eq!(recover_public_key(&signature, &hash).unwrap(), pk);
    }

    #[test]
    fn tampered_hash_fails_verification() {
        let (sk, pk) = generate_keypair();
        let hash = MessageHash::new([1; 32]);
        let signature = sign_hash(&sk, &hash);

        let other = MessageHash::new([2; 32]);
        assert!(verify_signature(&pk, &other, &signature).is_err());
        assert_ne!(recover_public_key(&signature, &other).ok(), Some(pk));
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let hash = MessageHash::new([1; 32]);
        assert_eq!(
            recover_public_key(&[0u8; 64], &hash).unwrap_err(),
            CryptoError::InvalidSignatureLength {
                expected: 65,
                got: 64
            }
        );
    }

    #[test]
    fn batch_hash_depends_on_content() {
        let batch = batch_with_nonces(3, &[1, 2]);
        let mut other = batch.clone();
        other.id = 4;

        assert_eq!(batch_message_hash(&batch), batch_message_hash(&batch.clone()));
        assert_ne!(batch_message_hash(&batch), batch_message_hash(&other));
    }
}
