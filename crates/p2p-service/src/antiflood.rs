//! Per-topic, per-peer message quotas.
//!
//! Every peer gets a budget of messages per topic which is refilled by clearing all the counters on
//! a fixed interval. A message that would exceed the budget is dropped, never queued.

use std::{collections::HashMap, sync::Arc, time::Duration};

use libp2p::PeerId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    constants::{
        DEFAULT_ANTIFLOOD_RESET_INTERVAL, DEFAULT_MAX_MESSAGES_PER_INTERVAL, TOPIC_MIN_MESSAGES,
    },
    errors::P2PError,
};

/// Antiflood settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntifloodConfig {
    /// Disabled antiflood accepts everything.
    pub enabled: bool,

    /// Messages a peer may send on one topic between two resets.
    pub max_messages_per_interval: u32,

    /// How often the counters are cleared.
    pub reset_interval: Duration,
}

impl Default for AntifloodConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages_per_interval: DEFAULT_MAX_MESSAGES_PER_INTERVAL,
            reset_interval: DEFAULT_ANTIFLOOD_RESET_INTERVAL,
        }
    }
}

#[derive(Debug, Default)]
struct TopicCounters {
    max_messages: HashMap<String, u32>,
    counters: HashMap<String, HashMap<PeerId, u32>>,
}

/// Counts the messages every peer sent on every topic.
#[derive(Debug)]
pub struct TopicFloodPreventer {
    default_max_messages: u32,
    inner: RwLock<TopicCounters>,
}

impl TopicFloodPreventer {
    /// Creates a preventer whose topics allow `default_max_messages` per interval unless
    /// configured otherwise.
    pub fn new(default_max_messages: u32) -> Result<Self, P2PError> {
        check_max_messages(default_max_messages)?;

        Ok(Self {
            default_max_messages,
            inner: RwLock::new(TopicCounters::default()),
        })
    }

    /// Adds `num_messages` to the load of `peer` on `topic`.
    ///
    /// Fails, leaving the load untouched, if the budget of the topic would be exceeded.
    pub fn increase_load(
        &self,
        peer: &PeerId,
        topic: &str,
        num_messages: u32,
    ) -> Result<(), P2PError> {
        let mut inner = self.inner.write();
        let max = inner
            .max_messages
            .get(topic)
            .copied()
            .unwrap_or(self.default_max_messages);

        let counter = inner
            .counters
            .entry(topic.to_string())
            .or_default()
            .entry(*peer)
            .or_default();

        let after = counter.saturating_add(num_messages);
        if after > max {
            return Err(P2PError::SystemBusy {
                topic: topic.to_string(),
            });
        }

        *counter = after;
        Ok(())
    }

    /// Clears the counters of `topic`.
    pub fn reset_for_topic(&self, topic: &str) {
        self.inner.write().counters.remove(topic);
    }

    /// Clears every counter.
    pub fn reset_all(&self) {
        self.inner.write().counters.clear();
    }

    /// Overrides the budget of `topic`.
    pub fn set_max_messages_for_topic(&self, topic: &str, max: u32) -> Result<(), P2PError> {
        check_max_messages(max)?;
        self.inner
            .write()
            .max_messages
            .insert(topic.to_string(), max);

        Ok(())
    }

    /// The budget of `topic`.
    pub fn max_messages_for_topic(&self, topic: &str) -> u32 {
        self.inner
            .read()
            .max_messages
            .get(topic)
            .copied()
            .unwrap_or(self.default_max_messages)
    }
}

fn check_max_messages(provided: u32) -> Result<(), P2PError> {
    if provided < TOPIC_MIN_MESSAGES {
        return Err(P2PError::InvalidNumberOfMessages {
            provided,
            minimum: TOPIC_MIN_MESSAGES,
        });
    }

    Ok(())
}

/// Admission control applied by the broadcaster to every received message.
#[derive(Debug)]
pub struct AntifloodHandler {
    enabled: bool,
    reset_interval: Duration,
    topic_preventer: TopicFloodPreventer,
}

impl AntifloodHandler {
    /// Creates a handler out of `config`.
    pub fn new(config: &AntifloodConfig) -> Result<Self, P2PError> {
        Ok(Self {
            enabled: config.enabled,
            reset_interval: config.reset_interval,
            topic_preventer: TopicFloodPreventer::new(config.max_messages_per_interval)?,
        })
    }

    /// A handler that accepts everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            reset_interval: DEFAULT_ANTIFLOOD_RESET_INTERVAL,
            topic_preventer: TopicFloodPreventer {
                default_max_messages: u32::MAX,
                inner: RwLock::new(TopicCounters::default()),
            },
        }
    }

    /// Whether messages are actually counted.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Charges `num_messages` to `peer` on `topic`.
    pub fn can_process_messages_on_topic(
        &self,
        peer: &PeerId,
        topic: &str,
        num_messages: u32,
    ) -> Result<(), P2PError> {
        if !self.enabled {
            return Ok(());
        }

        self.topic_preventer
            .increase_load(peer, topic, num_messages)
            .inspect_err(|e| debug!(%peer, %topic, %e, "antiflood rejected message"))
    }

    /// Clears the counters of `topic`.
    pub fn reset_for_topic(&self, topic: &str) {
        self.topic_preventer.reset_for_topic(topic);
    }

    /// Overrides the budget of `topic`.
    pub fn set_max_messages_for_topic(&self, topic: &str, max: u32) -> Result<(), P2PError> {
        self.topic_preventer.set_max_messages_for_topic(topic, max)
    }

    /// Spawns the task clearing every counter each reset interval until `cancel` fires.
    pub fn spawn_reset_task(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.reset_interval);
            info!(interval = ?self.reset_interval, "antiflood reset task started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("antiflood reset task stopped");
                        return;
                    }
                    _ = interval.tick() => self.topic_preventer.reset_all(),
                }
            }
        })
    }
}
