//! Leader rotation over the relayer set.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bridge_relayer_primitives::types::RelayerPubKey;
use tracing::trace;

use crate::traits::{SortedPublicKeysProvider, TopologyProvider};

/// Default length of a leadership round.
pub const DEFAULT_ROUND_DURATION: Duration = Duration::from_secs(60);

/// Hands the leadership to each relayer in turn, one round of wall-clock time each.
///
/// The leader of a round is the key at index `(now / round_duration) % n` of the sorted relayer
/// list. Relayers with roughly synchronized clocks agree on it without talking to each other.
/// Rounds are counted in milliseconds, so sub-second durations rotate as configured.
#[derive(Debug, Clone)]
pub struct RoundRobinTopology {
    own_key: RelayerPubKey,
    relayers: Arc<dyn SortedPublicKeysProvider>,
    round_duration: Duration,
}

impl RoundRobinTopology {
    /// Creates the rotation for the relayer owning `own_key`.
    pub fn new(
        own_key: RelayerPubKey,
        relayers: Arc<dyn SortedPublicKeysProvider>,
        round_duration: Duration,
    ) -> Self {
        Self {
            own_key,
            relayers,
            round_duration,
        }
    }

    /// The leader of the round containing `now`, as a duration since the unix epoch.
    pub fn leader_at(&self, now: Duration) -> Option<RelayerPubKey> {
        let keys = self.relayers.sorted_public_keys();
        if keys.is_empty() {
            return None;
        }

        // a zero duration would divide by zero
        let round_millis = self.round_duration.as_millis().max(1);
        let round = now.as_millis() / round_millis;
        let index = (round % keys.len() as u128) as usize;

        keys.into_iter().nth(index)
    }

    /// Whether this relayer leads the round containing `now`.
    pub fn is_leader_at(&self, now: Duration) -> bool {
        self.leader_at(now)
            .is_some_and(|leader| leader == self.own_key)
    }
}

impl TopologyProvider for RoundRobinTopology {
    fn my_turn_as_leader(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        let leader = self.is_leader_at(now);
        trace!(%leader, "computed leadership");
        leader
    }
}
