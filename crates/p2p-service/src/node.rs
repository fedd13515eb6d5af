//! Bootstraps the libp2p node relayers talk through.
//!
//! The node runs gossipsub for the federation topics and a JSON request-response protocol for the
//! messages addressed to a single peer. The swarm lives in its own task; the rest of the relayer
//! talks to it through a [`NodeHandle`], which only enqueues commands.

use std::{error::Error, sync::Arc};

use async_trait::async_trait;
use futures::StreamExt;
use libp2p::{
    gossipsub::{self, IdentTopic, MessageAuthenticity, MessageId, ValidationMode},
    identify, noise, ping,
    request_response::{self, ProtocolSupport},
    swarm::{NetworkBehaviour, SwarmEvent},
    tcp, yamux, Multiaddr, PeerId, StreamProtocol, Swarm, SwarmBuilder,
};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::Configuration,
    constants::{DIRECT_MESSAGE_PROTOCOL, IDENTIFY_PROTOCOL, MAX_TRANSMIT_SIZE},
    denial::PeerDenialEvaluator,
    errors::P2PError,
    message::{DirectAck, DirectMessage, ReceivedMessage},
    traits::{MessageProcessor, Messenger},
};

#[derive(NetworkBehaviour)]
struct Behaviour {
    gossipsub: gossipsub::Behaviour,
    direct: request_response::json::Behaviour<DirectMessage, DirectAck>,
    identify: identify::Behaviour,
    ping: ping::Behaviour,
}

#[derive(Debug)]
enum Command {
    CreateTopic(String),
    Broadcast {
        topic: String,
        data: Vec<u8>,
        published: oneshot::Sender<Result<(), P2PError>>,
    },
    SendDirect { peer: PeerId, message: DirectMessage },
}

/// The [`Messenger`] backed by a running libp2p node.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    peer_id: PeerId,
    commands: mpsc::UnboundedSender<Command>,
    listen_addrs: Arc<RwLock<Vec<Multiaddr>>>,
    cancel: CancellationToken,
}

impl NodeHandle {
    /// The addresses the node currently listens on.
    pub fn listen_addrs(&self) -> Vec<Multiaddr> {
        self.listen_addrs.read().clone()
    }

    fn send(&self, command: Command) -> Result<(), P2PError> {
        self.commands
            .send(command)
            .map_err(|e| P2PError::Messenger(e.to_string()))
    }
}

#[async_trait]
impl Messenger for NodeHandle {
    fn id(&self) -> PeerId {
        self.peer_id
    }

    fn create_topic(&self, topic: &str) -> Result<(), P2PError> {
        self.send(Command::CreateTopic(topic.to_string()))
    }

    async fn broadcast(&self, topic: &str, data: Vec<u8>) -> Result<(), P2PError> {
        let (published, outcome) = oneshot::channel();
        self.send(Command::Broadcast {
            topic: topic.to_string(),
            data,
            published,
        })?;

        outcome
            .await
            .map_err(|_| P2PError::Messenger("p2p node stopped".to_string()))?
    }

    fn send_to_peer(&self, peer: &PeerId, topic: &str, data: Vec<u8>) -> Result<(), P2PError> {
        self.send(Command::SendDirect {
            peer: *peer,
            message: DirectMessage {
                topic: topic.to_string(),
                data,
            },
        })
    }

    fn close(&self) {
        info!("closing p2p node");
        self.cancel.cancel();
    }
}

/// The swarm, waiting for a message processor before it starts.
///
/// The processor usually needs the [`NodeHandle`] to be built, hence the two-phase startup.
pub struct NodeRunner {
    swarm: Swarm<Behaviour>,
    commands: mpsc::UnboundedReceiver<Command>,
    listen_addrs: Arc<RwLock<Vec<Multiaddr>>>,
    denial_evaluator: Arc<PeerDenialEvaluator>,
    connect_to: Vec<Multiaddr>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for NodeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRunner")
            .field("peer_id", self.swarm.local_peer_id())
            .field("connect_to", &self.connect_to)
            .finish_non_exhaustive()
    }
}

/// Builds the swarm and starts listening.
///
/// `denial_evaluator` is shared with the broadcaster so peers it blacklists are disconnected.
/// Nothing is processed until [`NodeRunner::spawn`] is called.
pub fn bootstrap(
    config: &Configuration,
    denial_evaluator: Arc<PeerDenialEvaluator>,
    cancel: CancellationToken,
) -> anyhow::Result<(NodeHandle, NodeRunner)> {
    let keypair = config.keypair.to_libp2p_keypair()?;
    let heartbeat_interval = config.heartbeat_interval();

    info!("initializing swarm");
    let mut swarm = SwarmBuilder::with_existing_identity(keypair)
        .with_tokio()
        .with_tcp(
            tcp::Config::default(),
            noise::Config::new,
            yamux::Config::default,
        )?
        .with_behaviour(|key| -> Result<_, Box<dyn Error + Send + Sync>> {
            let gossipsub_config = gossipsub::ConfigBuilder::default()
                .heartbeat_interval(heartbeat_interval)
                .validation_mode(ValidationMode::Strict)
                .validate_messages()
                .max_transmit_size(MAX_TRANSMIT_SIZE)
                .message_id_fn(|message: &gossipsub::Message| {
                    MessageId::from(Sha256::digest(&message.data).to_vec())
                })
                .build()?;

            Ok(Behaviour {
                gossipsub: gossipsub::Behaviour::new(
                    MessageAuthenticity::Signed(key.clone()),
                    gossipsub_config,
                )?,
                direct: request_response::json::Behaviour::new(
                    [(
                        StreamProtocol::new(DIRECT_MESSAGE_PROTOCOL),
                        ProtocolSupport::Full,
                    )],
                    request_response::Config::default(),
                ),
                identify: identify::Behaviour::new(identify::Config::new(
                    IDENTIFY_PROTOCOL.to_string(),
                    key.public(),
                )),
                ping: ping::Behaviour::default(),
            })
        })?
        .with_swarm_config(|c| c.with_idle_connection_timeout(config.idle_connection_timeout()))
        .build();
    debug!("swarm initialized");

    swarm.listen_on(config.listening_addr.clone())?;

    let peer_id = *swarm.local_peer_id();
    info!(%peer_id, addr = %config.listening_addr, "p2p node listening");

    let (tx, rx) = mpsc::unbounded_channel();
    let listen_addrs = Arc::new(RwLock::new(Vec::new()));

    let handle = NodeHandle {
        peer_id,
        commands: tx,
        listen_addrs: listen_addrs.clone(),
        cancel: cancel.clone(),
    };
    let runner = NodeRunner {
        swarm,
        commands: rx,
        listen_addrs,
        denial_evaluator,
        connect_to: config.connect_to.clone(),
        cancel,
    };

    Ok((handle, runner))
}

impl NodeRunner {
    /// Dials the initial peers and spawns the event loop, which runs until the node is closed.
    pub fn spawn(mut self, processor: Arc<dyn MessageProcessor>) -> JoinHandle<()> {
        info!("establishing connections");
        for addr in &self.connect_to {
            if let Err(e) = self.swarm.dial(addr.clone()) {
                warn!(%addr, %e, "could not dial peer");
            }
        }

        tokio::spawn(async move {
            info!("listening for network events and commands");
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!("p2p node stopped");
                        return;
                    }
                    Some(command) = self.commands.recv() => self.handle_command(command),
                    Some(event) = self.swarm.next() => self.handle_event(event, processor.as_ref()),
                }
            }
        })
    }

    fn handle_command(&mut self, command: Command) {
        let behaviour = self.swarm.behaviour_mut();
        match command {
            Command::CreateTopic(topic) => {
                match behaviour.gossipsub.subscribe(&IdentTopic::new(&topic)) {
                    Ok(true) => debug!(%topic, "subscribed"),
                    Ok(false) => debug!(%topic, "already subscribed"),
                    Err(e) => error!(%topic, %e, "could not subscribe"),
                }
            }
            Command::Broadcast {
                topic,
                data,
                published,
            } => {
                trace!(%topic, len = data.len(), "publishing");
                let outcome = match behaviour.gossipsub.publish(IdentTopic::new(&topic), data) {
                    Ok(message_id) => {
                        trace!(%topic, %message_id, "published");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(%topic, %e, "could not publish message");
                        Err(P2PError::Publish {
                            topic,
                            reason: e.to_string(),
                        })
                    }
                };
                // the caller may have stopped waiting
                let _ = published.send(outcome);
            }
            Command::SendDirect { peer, message } => {
                trace!(%peer, topic = %message.topic, "sending direct message");
                behaviour.direct.send_request(&peer, message);
            }
        }
    }

    fn handle_event(&mut self, event: SwarmEvent<BehaviourEvent>, processor: &dyn MessageProcessor) {
        match event {
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(%address, "started listening");
                self.listen_addrs.write().push(address);
            }
            SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                if self.denial_evaluator.is_denied(&peer_id) {
                    self.disconnect(peer_id);
                    return;
                }

                debug!(%peer_id, "connection established");
                self.swarm
                    .behaviour_mut()
                    .gossipsub
                    .add_explicit_peer(&peer_id);
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                debug!(%peer_id, "connection closed");
            }
            SwarmEvent::Behaviour(BehaviourEvent::Gossipsub(gossipsub::Event::Message {
                propagation_source,
                message_id,
                message,
            })) => {
                let received = ReceivedMessage {
                    topic: message.topic.as_str().to_string(),
                    data: message.data,
                    peer: propagation_source,
                    source: message.source,
                };

                let acceptance = match processor.process_received_message(&received) {
                    Ok(()) => gossipsub::MessageAcceptance::Accept,
                    Err(e) => e.acceptance(),
                };
                if let Err(e) = self
                    .swarm
                    .behaviour_mut()
                    .gossipsub
                    .report_message_validation_result(&message_id, &propagation_source, acceptance)
                {
                    warn!(%message_id, %e, "could not forward validated message");
                }

                self.disconnect_if_denied(&propagation_source);
            }
            SwarmEvent::Behaviour(BehaviourEvent::Direct(request_response::Event::Message {
                peer,
                message,
                ..
            })) => match message {
                request_response::Message::Request {
                    request, channel, ..
                } => {
                    let received = ReceivedMessage {
                        topic: request.topic,
                        data: request.data,
                        peer,
                        source: Some(peer),
                    };
                    let accepted = processor.process_received_message(&received).is_ok();
                    if self
                        .swarm
                        .behaviour_mut()
                        .direct
                        .send_response(channel, DirectAck { accepted })
                        .is_err()
                    {
                        warn!(%peer, "could not acknowledge direct message, connection closed");
                    }

                    self.disconnect_if_denied(&peer);
                }
                request_response::Message::Response { response, .. } => {
                    trace!(%peer, accepted = response.accepted, "direct message acknowledged");
                }
            },
            SwarmEvent::Behaviour(BehaviourEvent::Direct(
                request_response::Event::OutboundFailure { peer, error, .. },
            )) => {
                debug!(%peer, %error, "direct message failed");
            }
            SwarmEvent::Behaviour(BehaviourEvent::Identify(identify::Event::Received {
                peer_id,
                info,
                ..
            })) => {
                trace!(%peer_id, agent = %info.agent_version, "identify info received");
            }
            _ => {}
        }
    }

    fn disconnect_if_denied(&mut self, peer: &PeerId) {
        if self.denial_evaluator.is_denied(peer) {
            self.disconnect(*peer);
        }
    }

    fn disconnect(&mut self, peer: PeerId) {
        debug!(%peer, "disconnecting denied peer");
        if self.swarm.disconnect_peer_id(peer).is_err() {
            warn!(%peer, "denied peer was not connected");
        }
    }
}
