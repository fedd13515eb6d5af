//! Relayer-to-relayer messaging.
//!
//! Relayers gossip signed envelopes on two topics per federation and answer join announcements
//! with the signatures they already hold. Incoming messages go through size, signature,
//! whitelist, replay and antiflood checks before reaching the [`BroadcastClient`]s.

pub mod antiflood;
pub mod broadcaster;
pub mod config;
pub mod constants;
pub mod denial;
pub mod errors;
pub mod holder;
pub mod keys;
pub mod message;
pub mod node;
pub mod nonces;
pub mod traits;

pub use broadcaster::{Broadcaster, BroadcasterArgs};
pub use config::{Configuration, JoinSchedule};
pub use errors::P2PError;
pub use holder::SignaturesHolder;
pub use keys::RelayerKeypair;
pub use node::{bootstrap, NodeHandle, NodeRunner};
pub use traits::{BroadcastClient, MessageProcessor, Messenger, RoleProvider, SignatureProcessor};

#[cfg(test)]
mod tests;
