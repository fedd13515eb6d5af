//! Configuration for the P2P node.

use std::time::Duration;

use libp2p::Multiaddr;

use crate::{
    constants::{
        DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_IDLE_CONNECTION_TIMEOUT, DEFAULT_TIME_BEFORE_REPEAT_JOIN,
        DEFAULT_TIME_FOR_BOOTSTRAP, MIN_TIME_BEFORE_REPEAT_JOIN, MIN_TIME_FOR_BOOTSTRAP,
    },
    errors::P2PError,
    keys::RelayerKeypair,
};

/// Configuration for the P2P node.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// The relayer key, also used as libp2p identity.
    pub keypair: RelayerKeypair,

    /// The node's address.
    pub listening_addr: Multiaddr,

    /// Initial list of nodes to connect to at startup.
    pub connect_to: Vec<Multiaddr>,

    /// Idle connection timeout.
    ///
    /// Default is [`DEFAULT_IDLE_CONNECTION_TIMEOUT`] seconds.
    pub idle_connection_timeout: Option<Duration>,

    /// Gossipsub heartbeat interval.
    ///
    /// Default is [`DEFAULT_HEARTBEAT_INTERVAL`].
    pub heartbeat_interval: Option<Duration>,
}

impl Configuration {
    /// Creates a [`Configuration`] with the default timeouts.
    pub const fn new(
        keypair: RelayerKeypair,
        listening_addr: Multiaddr,
        connect_to: Vec<Multiaddr>,
    ) -> Self {
        Self {
            keypair,
            listening_addr,
            connect_to,
            idle_connection_timeout: None,
            heartbeat_interval: None,
        }
    }

    /// The idle connection timeout to apply.
    pub fn idle_connection_timeout(&self) -> Duration {
        self.idle_connection_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_IDLE_CONNECTION_TIMEOUT))
    }

    /// The heartbeat interval to apply.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// When a relayer announces itself on the join topic.
///
/// Gossip drops messages published before the node has peers on the topic, so the first
/// announcement waits for the bootstrap and later ones keep coming for peers that connect late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSchedule {
    time_for_bootstrap: Duration,
    time_before_repeat_join: Duration,
}

impl JoinSchedule {
    /// Validates both delays against [`MIN_TIME_FOR_BOOTSTRAP`] and
    /// [`MIN_TIME_BEFORE_REPEAT_JOIN`].
    pub fn new(
        time_for_bootstrap: Duration,
        time_before_repeat_join: Duration,
    ) -> Result<Self, P2PError> {
        if time_for_bootstrap < MIN_TIME_FOR_BOOTSTRAP {
            return Err(P2PError::InvalidDuration {
                name: "time_for_bootstrap",
                provided: time_for_bootstrap,
                minimum: MIN_TIME_FOR_BOOTSTRAP,
            });
        }
        if time_before_repeat_join < MIN_TIME_BEFORE_REPEAT_JOIN {
            return Err(P2PError::InvalidDuration {
                name: "time_before_repeat_join",
                provided: time_before_repeat_join,
                minimum: MIN_TIME_BEFORE_REPEAT_JOIN,
            });
        }

        Ok(Self {
            time_for_bootstrap,
            time_before_repeat_join,
        })
    }

    /// Delay before the first announcement.
    pub const fn time_for_bootstrap(&self) -> Duration {
        self.time_for_bootstrap
    }

    /// Interval between two announcements.
    pub const fn time_before_repeat_join(&self) -> Duration {
        self.time_before_repeat_join
    }
}

impl Default for JoinSchedule {
    fn default() -> Self {
        Self {
            time_for_bootstrap: DEFAULT_TIME_FOR_BOOTSTRAP,
            time_before_repeat_join: DEFAULT_TIME_BEFORE_REPEAT_JOIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let keypair = RelayerKeypair::generate();
        let mut config = Configuration::new(
            keypair.clone(),
            "/ip4/127.0.0.1/tcp/1234".parse().unwrap(),
            vec![],
        );
        assert_eq!(config.idle_connection_timeout(), Duration::from_secs(30));
        assert_eq!(config.heartbeat_interval(), DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(config.keypair.relayer_pubkey(), keypair.relayer_pubkey());

        config.idle_connection_timeout = Some(Duration::from_secs(5));
        assert_eq!(config.idle_connection_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn join_schedule_rejects_short_delays() {
        assert!(matches!(
            JoinSchedule::new(Duration::from_millis(10), DEFAULT_TIME_BEFORE_REPEAT_JOIN),
            Err(P2PError::InvalidDuration {
                name: "time_for_bootstrap",
                ..
            })
        ));
        assert!(matches!(
            JoinSchedule::new(DEFAULT_TIME_FOR_BOOTSTRAP, Duration::from_millis(999)),
            Err(P2PError::InvalidDuration {
                name: "time_before_repeat_join",
                ..
            })
        ));

        let schedule = JoinSchedule::new(MIN_TIME_FOR_BOOTSTRAP, MIN_TIME_BEFORE_REPEAT_JOIN).unwrap();
        assert_eq!(schedule.time_for_bootstrap(), MIN_TIME_FOR_BOOTSTRAP);
        assert_eq!(schedule.time_before_repeat_join(), MIN_TIME_BEFORE_REPEAT_JOIN);
    }
}
