//! Time-bounded blacklist of misbehaving peers.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use libp2p::PeerId;
use parking_lot::Mutex;
use tracing::debug;

/// Keeps track of the peers that must not be talked to until their ban expires.
#[derive(Debug, Default)]
pub struct PeerDenialEvaluator {
    denied_until: Mutex<HashMap<PeerId, Instant>>,
}

impl PeerDenialEvaluator {
    /// Creates an empty evaluator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Denies `peer` for `duration`, extending any current ban.
    pub fn upsert(&self, peer: PeerId, duration: Duration) {
        let until = Instant::now() + duration;
        let mut denied = self.denied_until.lock();
        let entry = denied.entry(peer).or_insert(until);
        if *entry < until {
            *entry = until;
        }

        debug!(%peer, ?duration, "peer denied");
    }

    /// Whether `peer` is currently denied. Expired bans are dropped.
    pub fn is_denied(&self, peer: &PeerId) -> bool {
        let mut denied = self.denied_until.lock();
        match denied.get(peer) {
            Some(until) if *until > Instant::now() => true,
            Some(_) => {
                denied.remove(peer);
                false
            }
            None => false,
        }
    }
}
