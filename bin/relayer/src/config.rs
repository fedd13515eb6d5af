use std::{path::PathBuf, time::Duration};

use bridge_relayer_clients::config::{BatchValidatorConfig, ChainAConfig, ChainBConfig};
use bridge_relayer_exec::config::ExecutorConfig;
use bridge_relayer_p2p_service::{
    antiflood::AntifloodConfig,
    constants::{DEFAULT_TIME_BEFORE_REPEAT_JOIN, DEFAULT_TIME_FOR_BOOTSTRAP},
};
use bridge_relayer_sm::config::RunnerConfig;
use serde::{Deserialize, Serialize};

use crate::constants::REST_API_DISABLED;

/// The configuration values that dictate the behavior of the relayer.
///
/// Every relayer of a federation must agree on the P2P name and, for the leader rotation to work,
/// on the topology step duration. The other values are local to the relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The number of runtime worker threads.
    pub num_threads: Option<u8>,

    /// The Chain-A gateway.
    pub chain_a: ChainAConfig,

    /// The Chain-B gateway and multisig.
    pub chain_b: ChainBConfig,

    /// The relayer-to-relayer network.
    pub p2p: P2PConfig,

    /// The relayer identity and federation tracking.
    pub relayer: RelayerConfig,

    /// The runners of both directions.
    pub state_machine: StateMachinesConfig,

    /// The executor shared by both directions.
    pub executor: ExecutorConfig,

    /// The external batch validator. Absent means disabled.
    pub batch_validator: Option<BatchValidatorConfig>,

    /// The status RPC server.
    pub rpc: RpcConfig,
}

impl Config {
    /// The status server address, unless the server is disabled.
    pub(crate) fn rpc_addr(&self) -> Option<&str> {
        let addr = self.rpc.addr.trim();
        (!addr.is_empty() && addr != REST_API_DISABLED).then_some(addr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct P2PConfig {
    /// The federation name, prefixing both topics.
    pub name: String,

    /// The multiaddr the node listens on.
    pub listening_addr: String,

    /// The multiaddrs dialed at startup.
    pub connect_to: Vec<String>,

    /// Idle connection timeout.
    pub idle_connection_timeout: Option<Duration>,

    /// Gossipsub heartbeat interval.
    pub heartbeat_interval: Option<Duration>,

    /// How long a peer relaying an invalid message stays denied.
    pub invalid_message_blacklist_duration: Duration,

    /// Per-peer message quotas.
    #[serde(default)]
    pub antiflood: AntifloodConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RelayerConfig {
    /// The hex encoded secp256k1 secret key of the relayer.
    ///
    /// It backs the P2P identity, the Chain-B account and the Chain-A signatures. A relative path
    /// is resolved against the working directory.
    pub private_key_file: PathBuf,

    /// How often the whitelists are refreshed from both chains.
    pub role_provider_polling: Duration,

    /// How long each relayer leads in turn.
    pub topology_step_duration: Duration,

    /// How long the P2P node looks for peers before the first join announcement.
    #[serde(default = "default_time_for_bootstrap")]
    pub time_for_bootstrap: Duration,

    /// The interval between two join announcements.
    #[serde(default = "default_time_before_repeat_join")]
    pub time_before_repeat_join: Duration,
}

const fn default_time_for_bootstrap() -> Duration {
    DEFAULT_TIME_FOR_BOOTSTRAP
}

const fn default_time_before_repeat_join() -> Duration {
    DEFAULT_TIME_BEFORE_REPEAT_JOIN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StateMachinesConfig {
    /// The Chain-A to Chain-B runner.
    pub a_to_b: RunnerConfig,

    /// The Chain-B to Chain-A runner.
    pub b_to_a: RunnerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RpcConfig {
    /// The address the status server binds to, `off` to disable it.
    pub addr: String,
}
