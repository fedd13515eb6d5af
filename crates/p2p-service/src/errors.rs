//! Errors of the p2p service.

use libp2p::gossipsub::MessageAcceptance;
use thiserror::Error;

/// Errors raised while processing or producing relayer messages.
#[derive(Debug, Error)]
pub enum P2PError {
    /// The broadcaster was given an empty federation name.
    #[error("empty name")]
    EmptyName,

    /// A field of a received message exceeds the allowed size.
    #[error("invalid size for {field} field: {size} bytes")]
    InvalidSize {
        /// The name of the offending field.
        field: &'static str,

        /// Its size in bytes.
        size: usize,
    },

    /// The message could not be decoded.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// The public key carried by a message is malformed.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The envelope signature does not match its content.
    #[error("invalid envelope signature")]
    InvalidSignature,

    /// The sender is not part of the relayer set.
    #[error("current peer is not whitelisted: {0}")]
    PeerNotWhitelisted(String),

    /// The message nonce is not greater than the last one seen from the same sender.
    #[error("nonce too low in received message: last {last}, received {received}")]
    NonceTooLowInReceivedMessage {
        /// The last accepted nonce.
        last: u64,

        /// The nonce carried by the message.
        received: u64,
    },

    /// The sending peer exceeded its message quota on the topic.
    #[error("system busy on topic {topic}")]
    SystemBusy {
        /// The topic the quota applies to.
        topic: String,
    },

    /// The quota value is below the minimum.
    #[error("invalid number of messages {provided}, minimum {minimum}")]
    InvalidNumberOfMessages {
        /// The value that was provided.
        provided: u32,

        /// The smallest value allowed.
        minimum: u32,
    },

    /// A duration setting is below its minimum.
    #[error("invalid value for {name}: {provided:?}, minimum {minimum:?}")]
    InvalidDuration {
        /// The setting.
        name: &'static str,

        /// The value that was provided.
        provided: std::time::Duration,

        /// The smallest value allowed.
        minimum: std::time::Duration,
    },

    /// The relaying peer is currently denied.
    #[error("peer {0} is denied")]
    PeerDenied(String),

    /// The message was received on a topic the broadcaster does not handle.
    #[error("unknown topic {0}")]
    UnknownTopic(String),

    /// The inner Chain-A signature is invalid or was produced by a non relayer.
    #[error("invalid ethereum signature: {0}")]
    InvalidEthereumSignature(String),

    /// The network layer could not accept the command.
    #[error("messenger: {0}")]
    Messenger(String),

    /// Gossip refused to publish the message, usually for lack of peers on the topic.
    #[error("could not publish on {topic}: {reason}")]
    Publish {
        /// The topic the message was meant for.
        topic: String,

        /// Why gossipsub refused it.
        reason: String,
    },
}

impl P2PError {
    /// How gossip should treat a message that failed with this error.
    ///
    /// Forged or malformed messages are rejected, which penalizes the peer that relayed them.
    /// Anything else is only ignored so honest relays of stale messages are not punished.
    pub fn acceptance(&self) -> MessageAcceptance {
        match self {
            Self::Decode(_)
            | Self::InvalidSize { .. }
            | Self::InvalidPublicKey(_)
            | Self::InvalidSignature
            | Self::PeerDenied(_) => MessageAcceptance::Reject,
            _ => MessageAcceptance::Ignore,
        }
    }
}
