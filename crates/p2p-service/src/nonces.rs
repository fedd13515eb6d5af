//! Replay protection for received messages.

use std::collections::HashMap;

use bridge_relayer_primitives::types::RelayerPubKey;
use parking_lot::RwLock;

use crate::errors::P2PError;

/// Last accepted nonce of every sender.
///
/// Entries only ever grow: a sender's nonce can be raised but never lowered or removed.
#[derive(Debug, Default)]
pub struct NonceMap {
    nonces: RwLock<HashMap<RelayerPubKey, u64>>,
}

impl NonceMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `nonce` if it is strictly greater than the last one seen from `sender`.
    pub fn check_and_update(&self, sender: &RelayerPubKey, nonce: u64) -> Result<(), P2PError> {
        let mut nonces = self.nonces.write();
        match nonces.get(sender) {
            Some(&last) if nonce <= last => Err(P2PError::NonceTooLowInReceivedMessage {
                last,
                received: nonce,
            }),
            _ => {
                nonces.insert(sender.clone(), nonce);
                Ok(())
            }
        }
    }

    /// The last nonce accepted from `sender`.
    pub fn last(&self, sender: &RelayerPubKey) -> Option<u64> {
        self.nonces.read().get(sender).copied()
    }
}
