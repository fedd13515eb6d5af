//! Basic types shared by the relayer crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a proposed action on Chain-B's multisig.
pub type ActionId = u64;

/// The value Chain-B returns when no action matches a query.
pub const INVALID_ACTION_ID: ActionId = 0;

/// The public key of a relayer, as raw bytes.
///
/// This is the key relayers sign their P2P envelopes with and the key the whitelist is expressed
/// in. Ordering is lexicographic over the bytes, which is what the leader rotation relies on.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelayerPubKey(#[serde(with = "hex::serde")] Vec<u8>);

impl RelayerPubKey {
    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RelayerPubKey {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for RelayerPubKey {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<RelayerPubKey> for Vec<u8> {
    fn from(value: RelayerPubKey) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for RelayerPubKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for RelayerPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for RelayerPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelayerPubKey({self})")
    }
}

/// A 32-byte digest of a batch, signed off-chain by every relayer.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageHash(#[serde(with = "hex::serde")] [u8; 32]);

impl MessageHash {
    /// Wraps a raw digest.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest.
    pub const fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Whether this is the all-zero hash, which is never a valid batch digest.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for MessageHash {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for MessageHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into()?))
    }
}

impl AsRef<[u8]> for MessageHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageHash({self})")
    }
}

/// A 20-byte Chain-A account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EthAddress(#[serde(with = "hex::serde")] [u8; 20]);

impl EthAddress {
    /// Wraps raw address bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    pub const fn to_bytes(&self) -> [u8; 20] {
        self.0
    }
}

impl From<[u8; 20]> for EthAddress {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for EthAddress {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into()?))
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({self})")
    }
}

/// The direction a batch travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From Chain-A to Chain-B.
    AToB,

    /// From Chain-B to Chain-A.
    BToA,
}

impl Direction {
    /// The chain the batch is read from.
    pub const fn source(&self) -> &'static str {
        match self {
            Self::AToB => "chain-a",
            Self::BToA => "chain-b",
        }
    }

    /// The chain the batch is executed on.
    pub const fn destination(&self) -> &'static str {
        match self {
            Self::AToB => "chain-b",
            Self::BToA => "chain-a",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source(), self.destination())
    }
}
