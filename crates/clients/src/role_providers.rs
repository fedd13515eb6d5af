//! The whitelists incoming P2P messages are checked against.
//!
//! Relayer keys come from the Chain-B staking contract and relayer addresses from the Chain-A
//! bridge contract. Both lists are refreshed periodically so a relayer joining or leaving the
//! federation is picked up without a restart.

use std::{collections::BTreeSet, fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use bridge_relayer_exec::traits::{ClientResult, SortedPublicKeysProvider};
use bridge_relayer_p2p_service::{P2PError, RoleProvider, SignatureProcessor};
use bridge_relayer_primitives::{
    eth::{address_from_public_key, recover_public_key, verify_signature},
    relayer_set::RelayerSet,
    types::{EthAddress, MessageHash, RelayerPubKey},
};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::RoleProviderError;

/// Fetches the current relayer list from a chain.
#[async_trait]
pub trait RelayersFetcher<T>: Debug + Send + Sync {
    /// The relayers the chain currently knows.
    async fn fetch_relayers(&self, cancel: &CancellationToken) -> ClientResult<Vec<T>>;
}

/// A whitelist that can be replaced wholesale.
pub trait Refreshable<T>: Debug + Send + Sync {
    /// Replaces the whitelist with `entries`. The previous list is kept on error.
    fn refresh(&self, entries: Vec<T>) -> Result<(), RoleProviderError>;
}

/// Whitelist of the relayer keys allowed on the P2P topics.
#[derive(Debug, Default)]
pub struct WhitelistRoleProvider {
    keys: RwLock<Vec<RelayerPubKey>>,
}

impl WhitelistRoleProvider {
    /// Creates a provider whitelisting `keys`.
    pub fn new(keys: impl IntoIterator<Item = RelayerPubKey>) -> Result<Self, RoleProviderError> {
        let set = RelayerSet::new(keys)?;
        Ok(Self {
            keys: RwLock::new(set.keys().to_vec()),
        })
    }

    /// Number of whitelisted relayers.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether nobody is whitelisted yet.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl Refreshable<RelayerPubKey> for WhitelistRoleProvider {
    fn refresh(&self, entries: Vec<RelayerPubKey>) -> Result<(), RoleProviderError> {
        let set = RelayerSet::new(entries)?;
        let mut keys = self.keys.write();
        if keys.as_slice() != set.keys() {
            info!(relayers = set.cardinality(), "relayer whitelist changed");
            *keys = set.keys().to_vec();
        }

        Ok(())
    }
}

impl RoleProvider for WhitelistRoleProvider {
    fn is_whitelisted(&self, key: &RelayerPubKey) -> bool {
        self.keys.read().binary_search(key).is_ok()
    }
}

impl SortedPublicKeysProvider for WhitelistRoleProvider {
    fn sorted_public_keys(&self) -> Vec<RelayerPubKey> {
        self.keys.read().clone()
    }
}

/// Whitelist of the Chain-A relayer addresses.
///
/// Checks the signatures carried on the sign topic: the signer recovered from a 65-byte
/// recoverable signature must be whitelisted and the compact part must verify.
#[derive(Debug, Default)]
pub struct EthereumRoleProvider {
    addresses: RwLock<BTreeSet<EthAddress>>,
}

impl EthereumRoleProvider {
    /// Creates a provider whitelisting `addresses`.
    pub fn new(addresses: impl IntoIterator<Item = EthAddress>) -> Self {
        Self {
            addresses: RwLock::new(addresses.into_iter().collect()),
        }
    }

    /// Whether `address` is whitelisted.
    pub fn is_whitelisted(&self, address: &EthAddress) -> bool {
        self.addresses.read().contains(address)
    }

    fn verify(&self, signature: &[u8], message_hash: &MessageHash) -> Result<(), RoleProviderError> {
        let public_key = recover_public_key(signature, message_hash)?;
        let address = address_from_public_key(&public_key);
        if !self.is_whitelisted(&address) {
            return Err(RoleProviderError::AddressNotWhitelisted(address.to_string()));
        }

        verify_signature(&public_key, message_hash, signature)?;
        Ok(())
    }
}

impl Refreshable<EthAddress> for EthereumRoleProvider {
    fn refresh(&self, entries: Vec<EthAddress>) -> Result<(), RoleProviderError> {
        let fresh: BTreeSet<_> = entries.into_iter().collect();
        let mut addresses = self.addresses.write();
        if *addresses != fresh {
            info!(relayers = fresh.len(), "chain A relayer whitelist changed");
            *addresses = fresh;
        }

        Ok(())
    }
}

impl SignatureProcessor for EthereumRoleProvider {
    fn verify_eth_signature(
        &self,
        signature: &[u8],
        message_hash: &MessageHash,
    ) -> Result<(), P2PError> {
        self.verify(signature, message_hash)
            .map_err(|e| P2PError::InvalidEthereumSignature(e.to_string()))
    }
}

/// Refreshes `provider` from `fetcher` once, then every `interval` until `cancel` fires.
///
/// Failed fetches keep the current whitelist.
pub fn spawn_polling<T: Send + 'static>(
    name: &'static str,
    provider: Arc<dyn Refreshable<T>>,
    fetcher: Arc<dyn RelayersFetcher<T>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match fetcher.fetch_relayers(&cancel).await {
                Ok(entries) => {
                    if let Err(e) = provider.refresh(entries) {
                        warn!(%name, %e, "ignoring fetched relayers");
                    }
                }
                Err(e) => warn!(%name, %e, "could not fetch relayers"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%name, "relayers polling stopped");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    })
}
