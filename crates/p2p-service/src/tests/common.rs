//! Helpers for the P2P tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use bridge_relayer_primitives::types::{MessageHash, RelayerPubKey};
use libp2p::PeerId;
use parking_lot::Mutex;

use crate::{
    antiflood::AntifloodHandler,
    broadcaster::{Broadcaster, BroadcasterArgs},
    denial::PeerDenialEvaluator,
    errors::P2PError,
    holder::SignaturesHolder,
    keys::RelayerKeypair,
    message::{signing_bytes, ReceivedMessage, SignedMessage},
    traits::{MessageProcessor, Messenger, RoleProvider, SignatureProcessor},
};

#[derive(Debug)]
struct Queued {
    from: PeerId,
    to: Option<PeerId>,
    topic: String,
    data: Vec<u8>,
}

/// A network delivering messages only when [`MockNetwork::flush`] is called.
#[derive(Debug, Default)]
pub(crate) struct MockNetwork {
    queue: Mutex<VecDeque<Queued>>,
    processors: Mutex<HashMap<PeerId, Arc<dyn MessageProcessor>>>,
    subscriptions: Mutex<HashMap<PeerId, HashSet<String>>>,
}

impl MockNetwork {
    pub(crate) fn attach(&self, peer: PeerId, processor: Arc<dyn MessageProcessor>) {
        self.processors.lock().insert(peer, processor);
    }

    /// Delivers every queued message, including the ones queued while delivering.
    ///
    /// Returns the outcome of each delivery.
    pub(crate) fn flush(&self) -> Vec<Result<(), P2PError>> {
        let mut results = Vec::new();
        loop {
            let Some(queued) = self.queue.lock().pop_front() else {
                return results;
            };

            let targets: Vec<PeerId> = match queued.to {
                Some(peer) => vec![peer],
                None => self
                    .subscriptions
                    .lock()
                    .iter()
                    .filter(|(peer, topics)| **peer != queued.from && topics.contains(&queued.topic))
                    .map(|(peer, _)| *peer)
                    .collect(),
            };

            for target in targets {
                let processor = self.processors.lock().get(&target).cloned();
                if let Some(processor) = processor {
                    results.push(processor.process_received_message(&ReceivedMessage {
                        topic: queued.topic.clone(),
                        data: queued.data.clone(),
                        peer: queued.from,
                        source: Some(queued.from),
                    }));
                }
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MockMessenger {
    id: PeerId,
    network: Arc<MockNetwork>,
}

#[async_trait]
impl Messenger for MockMessenger {
    fn id(&self) -> PeerId {
        self.id
    }

    fn create_topic(&self, topic: &str) -> Result<(), P2PError> {
        self.network
            .subscriptions
            .lock()
            .entry(self.id)
            .or_default()
            .insert(topic.to_string());
        Ok(())
    }

    async fn broadcast(&self, topic: &str, data: Vec<u8>) -> Result<(), P2PError> {
        self.network.queue.lock().push_back(Queued {
            from: self.id,
            to: None,
            topic: topic.to_string(),
            data,
        });
        Ok(())
    }

    fn send_to_peer(&self, peer: &PeerId, topic: &str, data: Vec<u8>) -> Result<(), P2PError> {
        self.network.queue.lock().push_back(Queued {
            from: self.id,
            to: Some(*peer),
            topic: topic.to_string(),
            data,
        });
        Ok(())
    }

    fn close(&self) {}
}

#[derive(Debug, Default)]
pub(crate) struct StaticRoles(pub(crate) HashSet<RelayerPubKey>);

impl RoleProvider for StaticRoles {
    fn is_whitelisted(&self, key: &RelayerPubKey) -> bool {
        self.0.contains(key)
    }
}

/// Accepts any 65-byte signature.
#[derive(Debug)]
pub(crate) struct LengthOnlySignatureProcessor;

impl SignatureProcessor for LengthOnlySignatureProcessor {
    fn verify_eth_signature(
        &self,
        signature: &[u8],
        _message_hash: &MessageHash,
    ) -> Result<(), P2PError> {
        if signature.len() != 65 {
            return Err(P2PError::InvalidEthereumSignature(format!(
                "expected 65 bytes, got {}",
                signature.len()
            )));
        }

        Ok(())
    }
}

/// A broadcaster attached to a [`MockNetwork`], with a holder registered as its client.
pub(crate) struct Relayer {
    pub(crate) peer_id: PeerId,
    pub(crate) keypair: RelayerKeypair,
    pub(crate) broadcaster: Arc<Broadcaster>,
    pub(crate) holder: Arc<SignaturesHolder>,
    pub(crate) denial_evaluator: Arc<PeerDenialEvaluator>,
}

pub(crate) struct Setup {
    pub(crate) network: Arc<MockNetwork>,
    pub(crate) roles: Arc<StaticRoles>,
    pub(crate) keypairs: Vec<RelayerKeypair>,
}

impl Setup {
    /// Generates `n` whitelisted relayer keys.
    pub(crate) fn new(n: usize) -> Self {
        let keypairs: Vec<_> = (0..n).map(|_| RelayerKeypair::generate()).collect();
        let roles = StaticRoles(keypairs.iter().map(|k| k.relayer_pubkey()).collect());

        Self {
            network: Arc::new(MockNetwork::default()),
            roles: Arc::new(roles),
            keypairs,
        }
    }

    pub(crate) fn messenger(&self, id: PeerId) -> Arc<MockMessenger> {
        Arc::new(MockMessenger {
            id,
            network: self.network.clone(),
        })
    }

    /// Builds the relayer owning the `idx`-th key and attaches it to the network.
    pub(crate) async fn relayer(&self, idx: usize, antiflood: AntifloodHandler) -> Relayer {
        let keypair = self.keypairs[idx].clone();
        let peer_id = PeerId::random();
        let denial_evaluator = Arc::new(PeerDenialEvaluator::new());

        let broadcaster = Broadcaster::new(BroadcasterArgs {
            name: "test".to_string(),
            keypair: keypair.clone(),
            messenger: self.messenger(peer_id),
            role_provider: self.roles.clone(),
            signature_processor: Arc::new(LengthOnlySignatureProcessor),
            antiflood: Arc::new(antiflood),
            denial_evaluator: denial_evaluator.clone(),
            invalid_message_blacklist_duration: Duration::from_secs(60),
            nonce_store: None,
        })
        .await
        .unwrap();
        let broadcaster = Arc::new(broadcaster);

        let holder = Arc::new(SignaturesHolder::new());
        broadcaster.add_broadcast_client(holder.clone());
        self.network.attach(peer_id, broadcaster.clone());

        Relayer {
            peer_id,
            keypair,
            broadcaster,
            holder,
            denial_evaluator,
        }
    }
}

/// A valid envelope signed by `keypair`.
pub(crate) fn signed_message(keypair: &RelayerKeypair, payload: &[u8], nonce: u64) -> SignedMessage {
    SignedMessage {
        payload: payload.to_vec(),
        public_key_bytes: keypair.relayer_pubkey().as_bytes().to_vec(),
        signature: keypair.sign(&signing_bytes(payload, nonce)),
        nonce,
    }
}

pub(crate) fn received(topic: &str, msg: &SignedMessage, peer: PeerId) -> ReceivedMessage {
    ReceivedMessage {
        topic: topic.to_string(),
        data: serde_json::to_vec(msg).unwrap(),
        peer,
        source: Some(peer),
    }
}
