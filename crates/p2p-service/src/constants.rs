//! Constants used throughout the p2p service.

use std::time::Duration;

/// Suffix of the topic late relayers announce themselves on.
pub const JOIN_TOPIC_SUFFIX: &str = "join";

/// Suffix of the topic batch signatures are exchanged on.
pub const SIGN_TOPIC_SUFFIX: &str = "sign";

/// Payload of the message broadcast on the join topic.
pub const JOIN_TOPIC_MESSAGE: &[u8] = b"join topic";

/// Upper bound, in bytes, of every field of a signed message.
pub const MAX_FIELD_SIZE: usize = 1024;

/// How long a peer that sent an undecodable or forged message stays denied.
pub const DEFAULT_INVALID_MESSAGE_BLACKLIST_DURATION: Duration = Duration::from_secs(3600);

/// Default idle connection timeout in seconds.
pub const DEFAULT_IDLE_CONNECTION_TIMEOUT: u64 = 30;

/// Default gossipsub heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Protocol name of the direct peer-to-peer messages.
pub const DIRECT_MESSAGE_PROTOCOL: &str = "/bridge-relayer/direct/1.0.0";

/// Protocol name announced through identify.
pub const IDENTIFY_PROTOCOL: &str = "/bridge-relayer/id/1.0.0";

/// Largest gossip message accepted by the node.
pub const MAX_TRANSMIT_SIZE: usize = 64 * 1024;

/// Minimum number of messages a topic may allow per interval.
pub const TOPIC_MIN_MESSAGES: u32 = 1;

/// Default number of messages a peer may send on a topic per interval.
pub const DEFAULT_MAX_MESSAGES_PER_INTERVAL: u32 = 100;

/// Default interval after which the antiflood counters are cleared.
pub const DEFAULT_ANTIFLOOD_RESET_INTERVAL: Duration = Duration::from_secs(1);

/// Default delay before the first join announcement, giving the node time to find its peers.
pub const DEFAULT_TIME_FOR_BOOTSTRAP: Duration = Duration::from_secs(5);

/// Smallest delay accepted before the first join announcement.
pub const MIN_TIME_FOR_BOOTSTRAP: Duration = Duration::from_millis(100);

/// Default interval between two join announcements.
pub const DEFAULT_TIME_BEFORE_REPEAT_JOIN: Duration = Duration::from_secs(30);

/// Smallest interval accepted between two join announcements.
pub const MIN_TIME_BEFORE_REPEAT_JOIN: Duration = Duration::from_secs(1);
