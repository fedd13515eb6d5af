//! The ordered set of relayers that make up the federation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{errors::RelayerSetError, types::RelayerPubKey};

/// An ordered, duplicate-free table of relayer keys.
///
/// The order is the byte order of the keys, so every relayer that sees the same list computes the
/// same indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayerSet {
    keys: Vec<RelayerPubKey>,
}

impl RelayerSet {
    /// Builds a set out of `entries`, failing on duplicates or an empty list.
    pub fn new(entries: impl IntoIterator<Item = RelayerPubKey>) -> Result<Self, RelayerSetError> {
        let mut keys = BTreeSet::new();
        for key in entries {
            let display = key.to_string();
            if !keys.insert(key) {
                return Err(RelayerSetError::DuplicatedKey(display));
            }
        }

        if keys.is_empty() {
            return Err(RelayerSetError::Empty);
        }

        Ok(Self {
            keys: keys.into_iter().collect(),
        })
    }

    /// Number of relayers.
    pub fn cardinality(&self) -> usize {
        self.keys.len()
    }

    /// The keys, sorted.
    pub fn keys(&self) -> &[RelayerPubKey] {
        &self.keys
    }

    /// The key at position `idx` of the sorted list.
    pub fn key_at(&self, idx: usize) -> Option<&RelayerPubKey> {
        self.keys.get(idx)
    }

    /// The position of `key` in the sorted list.
    pub fn index_of(&self, key: &RelayerPubKey) -> Option<usize> {
        self.keys.binary_search(key).ok()
    }

    /// Whether `key` belongs to the set.
    pub fn contains(&self, key: &RelayerPubKey) -> bool {
        self.index_of(key).is_some()
    }
}
