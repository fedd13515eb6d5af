//! In-memory store of the Chain-A signatures received from the federation.

use std::collections::{BTreeMap, HashMap};

use bridge_relayer_primitives::types::{MessageHash, RelayerPubKey};
use parking_lot::RwLock;
use tracing::trace;

use crate::{
    message::{EthereumSignature, SignedMessage},
    traits::BroadcastClient,
};

type SignaturesBySender = BTreeMap<RelayerPubKey, (SignedMessage, EthereumSignature)>;

/// Maps a batch message hash to the signature of every relayer that signed it.
///
/// A relayer appears at most once per hash; a newer message from the same relayer replaces the
/// older one.
#[derive(Debug, Default)]
pub struct SignaturesHolder {
    signed_messages: RwLock<HashMap<MessageHash, SignaturesBySender>>,
}

impl SignaturesHolder {
    /// Creates an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `signature` as the one `envelope`'s sender produced over its hash.
    pub fn store(&self, envelope: &SignedMessage, signature: &EthereumSignature) {
        let sender = envelope.sender();
        trace!(%sender, hash = %signature.message_hash, nonce = envelope.nonce, "storing signature");

        self.signed_messages
            .write()
            .entry(signature.message_hash)
            .or_default()
            .insert(sender, (envelope.clone(), signature.clone()));
    }

    /// The signatures collected for `hash`, one per relayer, ordered by relayer key.
    pub fn signatures(&self, hash: &MessageHash) -> Vec<Vec<u8>> {
        self.signed_messages
            .read()
            .get(hash)
            .map(|by_sender| {
                by_sender
                    .values()
                    .map(|(_, sig)| sig.signature.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drops every stored signature.
    pub fn clear(&self) {
        self.signed_messages.write().clear();
    }
}

impl BroadcastClient for SignaturesHolder {
    fn process_new_message(&self, envelope: &SignedMessage, signature: &EthereumSignature) {
        self.store(envelope, signature);
    }

    fn all_stored_signatures(&self) -> Vec<SignedMessage> {
        self.signed_messages
            .read()
            .values()
            .flat_map(|by_sender| by_sender.values().map(|(envelope, _)| envelope.clone()))
            .collect()
    }
}
