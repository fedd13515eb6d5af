//! The seams between the broadcaster and its collaborators.

use std::fmt::Debug;

use async_trait::async_trait;
use bridge_relayer_primitives::types::{MessageHash, RelayerPubKey};
use libp2p::PeerId;

use crate::{
    errors::P2PError,
    message::{EthereumSignature, ReceivedMessage, SignedMessage},
};

/// Decides whether a relayer key belongs to the federation.
pub trait RoleProvider: Debug + Send + Sync {
    /// Whether messages signed by `key` may be processed.
    fn is_whitelisted(&self, key: &RelayerPubKey) -> bool;
}

/// Validates the Chain-A signatures carried on the sign topic.
pub trait SignatureProcessor: Debug + Send + Sync {
    /// Fails unless `signature` was produced over `message_hash` by a whitelisted Chain-A relayer.
    fn verify_eth_signature(
        &self,
        signature: &[u8],
        message_hash: &MessageHash,
    ) -> Result<(), P2PError>;
}

/// Receives every valid signature the broadcaster processes.
pub trait BroadcastClient: Debug + Send + Sync {
    /// Called once per accepted signature.
    fn process_new_message(&self, envelope: &SignedMessage, signature: &EthereumSignature);

    /// The envelopes this client holds, replayed to relayers that join late.
    fn all_stored_signatures(&self) -> Vec<SignedMessage>;
}

/// Handles the messages delivered by the network layer.
pub trait MessageProcessor: Debug + Send + Sync {
    /// Processes one message. An error means the message was dropped.
    fn process_received_message(&self, message: &ReceivedMessage) -> Result<(), P2PError>;
}

/// The network layer as seen by the broadcaster.
///
/// Every method but [`Messenger::broadcast`] only enqueues work for the network task and returns
/// immediately.
#[async_trait]
pub trait Messenger: Debug + Send + Sync {
    /// The local peer id.
    fn id(&self) -> PeerId;

    /// Subscribes to `topic`.
    fn create_topic(&self, topic: &str) -> Result<(), P2PError>;

    /// Publishes `data` to every subscriber of `topic`.
    ///
    /// Resolves once the network task tried to publish, with its outcome.
    async fn broadcast(&self, topic: &str, data: Vec<u8>) -> Result<(), P2PError>;

    /// Sends `data` to a single connected `peer`, tagged with `topic`.
    fn send_to_peer(&self, peer: &PeerId, topic: &str, data: Vec<u8>) -> Result<(), P2PError>;

    /// Stops the network task.
    fn close(&self);
}
