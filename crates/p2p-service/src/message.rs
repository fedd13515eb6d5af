//! Wire format of the messages exchanged between relayers.

use bridge_relayer_primitives::types::{MessageHash, RelayerPubKey};
use libp2p::PeerId;
use serde::{Deserialize, Serialize};

use crate::{constants::MAX_FIELD_SIZE, errors::P2PError};

/// Envelope of every relayer message.
///
/// The signature covers `payload || BE(nonce)` and is produced with the key in
/// `public_key_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    /// The inner message.
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,

    /// The compressed public key of the sender.
    #[serde(with = "hex::serde")]
    pub public_key_bytes: Vec<u8>,

    /// Signature over the payload and nonce.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,

    /// Strictly increasing per sender.
    pub nonce: u64,
}

impl SignedMessage {
    /// The bytes covered by the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        signing_bytes(&self.payload, self.nonce)
    }

    /// Identifies a message regardless of who relayed it.
    pub fn unique_id(&self) -> (Vec<u8>, u64) {
        (self.public_key_bytes.clone(), self.nonce)
    }

    /// The sender key.
    pub fn sender(&self) -> RelayerPubKey {
        RelayerPubKey::from(self.public_key_bytes.clone())
    }

    /// Fails if any field is larger than [`MAX_FIELD_SIZE`].
    pub fn check_lengths(&self) -> Result<(), P2PError> {
        for (field, size) in [
            ("PublicKeyBytes", self.public_key_bytes.len()),
            ("Signature", self.signature.len()),
            ("Payload", self.payload.len()),
        ] {
            if size > MAX_FIELD_SIZE {
                return Err(P2PError::InvalidSize { field, size });
            }
        }

        Ok(())
    }
}

/// `payload || BE(nonce)`.
pub fn signing_bytes(payload: &[u8], nonce: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 8);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&nonce.to_be_bytes());
    buf
}

/// Payload of the sign topic: a Chain-A signature over a batch message hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumSignature {
    /// The 65-byte recoverable signature.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,

    /// The signed hash.
    pub message_hash: MessageHash,
}

/// A raw message handed over by the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// The topic the message was published or sent on.
    pub topic: String,

    /// The encoded [`SignedMessage`].
    pub data: Vec<u8>,

    /// The connected peer that delivered the message.
    pub peer: PeerId,

    /// The peer that originally published the message, when known.
    pub source: Option<PeerId>,
}

/// Request of the direct message protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// The topic the message belongs to.
    pub topic: String,

    /// The encoded [`SignedMessage`].
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

/// Response of the direct message protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectAck {
    /// Whether the receiver processed the message without error.
    pub accepted: bool,
}
