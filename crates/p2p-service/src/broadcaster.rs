//! Signs, publishes and validates the messages relayers exchange.
//!
//! Two topics are used per federation: `<name>/join`, where a relayer announces itself after
//! starting, and `<name>/sign`, where relayers share their Chain-A signatures. Every relayer that
//! sees a join message answers the joining peer directly with all the signatures it holds so a
//! late relayer can still reach quorum on the current batch.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bridge_relayer_db::checkpoint::CheckpointDb;
use bridge_relayer_primitives::types::{MessageHash, RelayerPubKey};
use libp2p::PeerId;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    antiflood::AntifloodHandler,
    config::JoinSchedule,
    constants::{JOIN_TOPIC_MESSAGE, JOIN_TOPIC_SUFFIX, SIGN_TOPIC_SUFFIX},
    denial::PeerDenialEvaluator,
    errors::P2PError,
    keys::{verify_signature, RelayerKeypair},
    message::{signing_bytes, EthereumSignature, ReceivedMessage, SignedMessage},
    nonces::NonceMap,
    traits::{BroadcastClient, MessageProcessor, Messenger, RoleProvider, SignatureProcessor},
};

/// Everything needed to build a [`Broadcaster`].
#[derive(Debug)]
pub struct BroadcasterArgs {
    /// The federation name, used as topic prefix.
    pub name: String,

    /// The relayer identity.
    pub keypair: RelayerKeypair,

    /// The network layer.
    pub messenger: Arc<dyn Messenger>,

    /// Whitelist of relayer keys.
    pub role_provider: Arc<dyn RoleProvider>,

    /// Validator of the Chain-A signatures.
    pub signature_processor: Arc<dyn SignatureProcessor>,

    /// Admission control.
    pub antiflood: Arc<AntifloodHandler>,

    /// Blacklist shared with the network layer.
    pub denial_evaluator: Arc<PeerDenialEvaluator>,

    /// How long a peer relaying an invalid message stays denied.
    pub invalid_message_blacklist_duration: Duration,

    /// Where the last used nonce is persisted, if anywhere.
    pub nonce_store: Option<Arc<dyn CheckpointDb>>,
}

/// The relayer's endpoint on the federation topics.
#[derive(Debug)]
pub struct Broadcaster {
    join_topic: String,
    sign_topic: String,
    keypair: RelayerKeypair,
    public_key: RelayerPubKey,
    counter: AtomicU64,
    nonces: NonceMap,
    messenger: Arc<dyn Messenger>,
    role_provider: Arc<dyn RoleProvider>,
    signature_processor: Arc<dyn SignatureProcessor>,
    antiflood: Arc<AntifloodHandler>,
    denial_evaluator: Arc<PeerDenialEvaluator>,
    invalid_message_blacklist_duration: Duration,
    nonce_store: Option<Arc<dyn CheckpointDb>>,
    clients: RwLock<Vec<Arc<dyn BroadcastClient>>>,
}

impl Broadcaster {
    /// Creates a broadcaster.
    ///
    /// The outgoing nonce counter starts at the current time in nanoseconds, or right after the
    /// last persisted nonce if that is larger, so a restarted relayer never reuses a nonce.
    pub async fn new(args: BroadcasterArgs) -> Result<Self, P2PError> {
        if args.name.is_empty() {
            return Err(P2PError::EmptyName);
        }

        let now_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        let stored = match &args.nonce_store {
            Some(store) => store.load_broadcast_nonce().await.unwrap_or_else(|e| {
                warn!(%e, "could not load the last broadcast nonce");
                None
            }),
            None => None,
        };
        let counter = stored.map_or(now_nanos, |n| now_nanos.max(n));

        let public_key = args.keypair.relayer_pubkey();
        info!(name = %args.name, %public_key, %counter, "broadcaster created");

        Ok(Self {
            join_topic: format!("{}/{JOIN_TOPIC_SUFFIX}", args.name),
            sign_topic: format!("{}/{SIGN_TOPIC_SUFFIX}", args.name),
            keypair: args.keypair,
            public_key,
            counter: AtomicU64::new(counter),
            nonces: NonceMap::new(),
            messenger: args.messenger,
            role_provider: args.role_provider,
            signature_processor: args.signature_processor,
            antiflood: args.antiflood,
            denial_evaluator: args.denial_evaluator,
            invalid_message_blacklist_duration: args.invalid_message_blacklist_duration,
            nonce_store: args.nonce_store,
            clients: RwLock::new(Vec::new()),
        })
    }

    /// The join topic name.
    pub fn join_topic(&self) -> &str {
        &self.join_topic
    }

    /// The sign topic name.
    pub fn sign_topic(&self) -> &str {
        &self.sign_topic
    }

    /// The key this broadcaster signs with.
    pub const fn public_key(&self) -> &RelayerPubKey {
        &self.public_key
    }

    /// Subscribes to both federation topics.
    pub fn register_on_topics(&self) -> Result<(), P2PError> {
        for topic in [&self.join_topic, &self.sign_topic] {
            self.messenger.create_topic(topic)?;
            info!(%topic, "registered");
        }

        Ok(())
    }

    /// Registers a client notified of every accepted signature.
    pub fn add_broadcast_client(&self, client: Arc<dyn BroadcastClient>) {
        self.clients.write().push(client);
    }

    /// Announces this relayer on the join topic.
    pub async fn broadcast_join_topic(&self) -> Result<(), P2PError> {
        let msg = self.create_message(JOIN_TOPIC_MESSAGE.to_vec()).await;
        self.messenger
            .broadcast(&self.join_topic, serde_json::to_vec(&msg)?)
            .await
    }

    /// Keeps announcing this relayer on the join topic until `cancel` fires.
    ///
    /// The first announcement waits for the bootstrap delay, then one goes out on every repeat
    /// interval so peers connecting later still learn about this relayer.
    pub fn spawn_join_task(
        self: Arc<Self>,
        schedule: JoinSchedule,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(schedule.time_for_bootstrap()) => {}
            }

            let mut interval = tokio::time::interval(schedule.time_before_repeat_join());
            info!(every = ?schedule.time_before_repeat_join(), "join task started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("join task stopped");
                        return;
                    }
                    _ = interval.tick() => match self.broadcast_join_topic().await {
                        Ok(()) => debug!(topic = %self.join_topic, "join announced"),
                        Err(e) => warn!(%e, "could not announce join"),
                    },
                }
            }
        })
    }

    /// Shares a Chain-A signature over `message_hash`.
    ///
    /// The message is also processed locally so this relayer's own signature counts towards the
    /// quorum.
    pub async fn broadcast_signature(
        &self,
        signature: Vec<u8>,
        message_hash: MessageHash,
    ) -> Result<(), P2PError> {
        let eth_sig = EthereumSignature {
            signature,
            message_hash,
        };
        let msg = self.create_message(serde_json::to_vec(&eth_sig)?).await;
        let data = serde_json::to_vec(&msg)?;

        let local = ReceivedMessage {
            topic: self.sign_topic.clone(),
            data: data.clone(),
            peer: self.messenger.id(),
            source: Some(self.messenger.id()),
        };
        if let Err(e) = self.process(&local, false) {
            warn!(%e, "own signature was not accepted locally");
        }

        self.messenger.broadcast(&self.sign_topic, data).await
    }

    /// Stops the network layer.
    pub fn close(&self) {
        self.messenger.close();
    }

    async fn create_message(&self, payload: Vec<u8>) -> SignedMessage {
        let nonce = self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        if let Some(store) = &self.nonce_store {
            if let Err(e) = store.store_broadcast_nonce(nonce).await {
                warn!(%e, %nonce, "could not persist the broadcast nonce");
            }
        }

        let signature = self.keypair.sign(&signing_bytes(&payload, nonce));
        SignedMessage {
            payload,
            public_key_bytes: self.public_key.as_bytes().to_vec(),
            signature,
            nonce,
        }
    }

    fn blacklist(&self, message: &ReceivedMessage) {
        self.denial_evaluator
            .upsert(message.peer, self.invalid_message_blacklist_duration);
        if let Some(source) = message.source {
            if source != message.peer {
                self.denial_evaluator
                    .upsert(source, self.invalid_message_blacklist_duration);
            }
        }
    }

    fn pre_process_message(&self, message: &ReceivedMessage) -> Result<SignedMessage, P2PError> {
        let msg: SignedMessage = serde_json::from_slice(&message.data).inspect_err(|_| {
            self.blacklist(message);
        })?;

        msg.check_lengths()?;

        verify_signature(&msg.public_key_bytes, &msg.signing_bytes(), &msg.signature)
            .inspect_err(|_| self.blacklist(message))?;

        Ok(msg)
    }

    fn process(&self, message: &ReceivedMessage, apply_antiflood: bool) -> Result<(), P2PError> {
        if message.topic != self.join_topic && message.topic != self.sign_topic {
            return Err(P2PError::UnknownTopic(message.topic.clone()));
        }

        if message.peer != self.messenger.id() && self.denial_evaluator.is_denied(&message.peer) {
            return Err(P2PError::PeerDenied(message.peer.to_string()));
        }

        let msg = self.pre_process_message(message)?;

        let sender = msg.sender();
        if !self.role_provider.is_whitelisted(&sender) {
            return Err(P2PError::PeerNotWhitelisted(sender.to_string()));
        }

        trace!(topic = %message.topic, nonce = msg.nonce, %sender, "got message");

        self.nonces.check_and_update(&sender, msg.nonce)?;

        if apply_antiflood {
            self.antiflood
                .can_process_messages_on_topic(&message.peer, &message.topic, 1)
                .inspect_err(|_| {
                    debug!(peer = %message.peer, topic = %message.topic, nonce = msg.nonce, %sender, "system busy");
                })?;
        }

        if message.topic == self.join_topic {
            self.process_join_message(&message.peer);
        } else {
            self.process_sign_message(&msg);
        }

        Ok(())
    }

    fn process_join_message(&self, peer: &PeerId) {
        if *peer == self.messenger.id() {
            return;
        }

        let messages = self.retrieve_unique_messages();
        debug!(%peer, count = messages.len(), "sending stored signatures to joining peer");

        for msg in messages.values() {
            let result = serde_json::to_vec(msg)
                .map_err(P2PError::from)
                .and_then(|data| self.messenger.send_to_peer(peer, &self.sign_topic, data));
            if let Err(e) = result {
                debug!(%peer, %e, "error sending current stored signatures");
            }
        }
    }

    fn retrieve_unique_messages(&self) -> BTreeMap<(Vec<u8>, u64), SignedMessage> {
        let mut all = BTreeMap::new();
        for client in self.clients.read().iter() {
            for msg in client.all_stored_signatures() {
                all.insert(msg.unique_id(), msg);
            }
        }

        all
    }

    fn process_sign_message(&self, msg: &SignedMessage) {
        let eth_sig = match self.ethereum_signature(msg) {
            Ok(sig) => sig,
            Err(e) => {
                debug!(%e, "received message does not contain a valid signature");
                return;
            }
        };

        for client in self.clients.read().iter() {
            client.process_new_message(msg, &eth_sig);
        }
    }

    fn ethereum_signature(&self, msg: &SignedMessage) -> Result<EthereumSignature, P2PError> {
        let eth_sig: EthereumSignature = serde_json::from_slice(&msg.payload)?;
        self.signature_processor
            .verify_eth_signature(&eth_sig.signature, &eth_sig.message_hash)?;

        Ok(eth_sig)
    }
}

impl MessageProcessor for Broadcaster {
    fn process_received_message(&self, message: &ReceivedMessage) -> Result<(), P2PError> {
        self.process(message, true).inspect_err(|e| {
            debug!(topic = %message.topic, peer = %message.peer, %e, "message dropped");
        })
    }
}

