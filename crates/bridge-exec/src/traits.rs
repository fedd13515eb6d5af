//! The collaborators of the bridge executor.
//!
//! Each chain is reached through a narrow client trait; the relayer set, the leader election, the
//! batch validator and the P2P layer have their own. The executor only holds trait objects so any
//! of them can be replaced in tests.

use std::fmt::Debug;

use async_trait::async_trait;
use bridge_relayer_p2p_service::{Broadcaster, P2PError, SignaturesHolder};
use bridge_relayer_primitives::{
    batch::{DepositStatus, TransferBatch},
    types::{ActionId, Direction, MessageHash, RelayerPubKey},
};
use primitive_types::U256;
use tokio_util::sync::CancellationToken;

use crate::errors::ClientError;

/// Result alias for the client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Chain-A, the EVM chain holding the bridge contract.
#[async_trait]
pub trait ChainAClient: Debug + Send + Sync {
    /// The Chain-A batch with id `nonce`, if Chain-A knows it.
    async fn get_batch(
        &self,
        cancel: &CancellationToken,
        nonce: u64,
    ) -> ClientResult<Option<TransferBatch>>;

    /// Whether the batch with id `batch_id` was executed.
    async fn was_executed(&self, cancel: &CancellationToken, batch_id: u64) -> ClientResult<bool>;

    /// Signs `message_hash` with this relayer's Chain-A key.
    fn sign_message_hash(&self, message_hash: &MessageHash) -> ClientResult<Vec<u8>>;

    /// Executes `batch` with the collected relayer signatures. Returns the transaction hash.
    async fn execute_transfer(
        &self,
        cancel: &CancellationToken,
        message_hash: &MessageHash,
        batch: &TransferBatch,
        signatures: Vec<Vec<u8>>,
    ) -> ClientResult<String>;

    /// Number of relayer signatures the bridge contract requires.
    async fn quorum(&self, cancel: &CancellationToken) -> ClientResult<u64>;

    /// The deposit statuses Chain-A recorded for `batch_id`. Empty while not final.
    async fn get_transactions_statuses(
        &self,
        cancel: &CancellationToken,
        batch_id: u64,
    ) -> ClientResult<Vec<DepositStatus>>;

    /// Fails if Chain-A is not fit to be used, for instance when it stopped producing blocks.
    async fn check_client_availability(&self, cancel: &CancellationToken) -> ClientResult<()>;

    /// Fails if the bridge account on Chain-A holds less than `amount` of `token`.
    async fn check_required_balance(
        &self,
        cancel: &CancellationToken,
        token: &[u8],
        amount: U256,
    ) -> ClientResult<()>;
}

/// Chain-B, the account chain holding the multisig.
#[async_trait]
pub trait ChainBClient: Debug + Send + Sync {
    /// The batch Chain-B wants relayed to Chain-A, if any.
    async fn get_pending_batch(&self, cancel: &CancellationToken)
        -> ClientResult<Option<TransferBatch>>;

    /// The id of the last Chain-A batch executed on Chain-B.
    async fn get_last_executed_a_batch_id(&self, cancel: &CancellationToken) -> ClientResult<u64>;

    /// The nonce of the last Chain-A deposit executed on Chain-B.
    async fn get_last_a_deposit_nonce(&self, cancel: &CancellationToken) -> ClientResult<u64>;

    /// The multisig action proposing the transfer of `batch`.
    async fn get_action_id_for_propose_transfer(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<ActionId>;

    /// The multisig action proposing the statuses of `batch`.
    async fn get_action_id_for_set_status(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<ActionId>;

    /// Whether the transfer of `batch` was proposed.
    async fn was_proposed_transfer(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<bool>;

    /// Whether the statuses of `batch` were proposed.
    async fn was_proposed_set_status(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<bool>;

    /// Whether this relayer signed `action_id`.
    async fn was_signed(&self, cancel: &CancellationToken, action_id: ActionId)
        -> ClientResult<bool>;

    /// Whether `action_id` was executed.
    async fn was_executed(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ClientResult<bool>;

    /// Whether `action_id` gathered enough signatures.
    async fn quorum_reached(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
    ) -> ClientResult<bool>;

    /// Proposes the transfer of `batch`. Returns the transaction hash.
    async fn propose_transfer(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<String>;

    /// Proposes the statuses of `batch`. Returns the transaction hash.
    async fn propose_set_status(
        &self,
        cancel: &CancellationToken,
        batch: &TransferBatch,
    ) -> ClientResult<String>;

    /// Signs `action_id`. Returns the transaction hash.
    async fn sign(&self, cancel: &CancellationToken, action_id: ActionId) -> ClientResult<String>;

    /// Executes `action_id`. Returns the transaction hash.
    async fn perform_action(
        &self,
        cancel: &CancellationToken,
        action_id: ActionId,
        batch: &TransferBatch,
    ) -> ClientResult<String>;

    /// Fails if Chain-B is not fit to be used.
    async fn check_client_availability(&self, cancel: &CancellationToken) -> ClientResult<()>;

    /// Fails if the bridge on Chain-B holds less than `amount` of `token`.
    async fn check_required_balance(
        &self,
        cancel: &CancellationToken,
        token: &[u8],
        amount: U256,
    ) -> ClientResult<()>;
}

/// An external service double-checking batches before they are relayed.
#[async_trait]
pub trait BatchValidator: Debug + Send + Sync {
    /// Whether `batch` may be relayed in `direction`.
    async fn validate_batch(
        &self,
        cancel: &CancellationToken,
        direction: Direction,
        batch: &TransferBatch,
    ) -> ClientResult<bool>;
}

/// Accepts every batch. Used when no validator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBatchValidator;

#[async_trait]
impl BatchValidator for DisabledBatchValidator {
    async fn validate_batch(
        &self,
        _cancel: &CancellationToken,
        _direction: Direction,
        _batch: &TransferBatch,
    ) -> ClientResult<bool> {
        Ok(true)
    }
}

/// Decides which relayer submits transactions in the current round.
pub trait TopologyProvider: Debug + Send + Sync {
    /// Whether this relayer leads the current round.
    fn my_turn_as_leader(&self) -> bool;
}

/// Lists the relayers of the federation.
pub trait SortedPublicKeysProvider: Debug + Send + Sync {
    /// The relayer keys in byte order.
    fn sorted_public_keys(&self) -> Vec<RelayerPubKey>;
}

/// Shares this relayer's Chain-A signatures with the federation.
#[async_trait]
pub trait SignaturesBroadcaster: Debug + Send + Sync {
    /// Broadcasts `signature` over `message_hash`.
    async fn broadcast_signature(
        &self,
        signature: Vec<u8>,
        message_hash: MessageHash,
    ) -> Result<(), P2PError>;
}

#[async_trait]
impl SignaturesBroadcaster for Broadcaster {
    async fn broadcast_signature(
        &self,
        signature: Vec<u8>,
        message_hash: MessageHash,
    ) -> Result<(), P2PError> {
        Broadcaster::broadcast_signature(self, signature, message_hash).await
    }
}

/// The Chain-A signatures received from the federation.
pub trait SignaturesSource: Debug + Send + Sync {
    /// Every distinct signature over `message_hash`.
    fn signatures(&self, message_hash: &MessageHash) -> Vec<Vec<u8>>;

    /// Drops every stored signature.
    fn clear(&self);
}

impl SignaturesSource for SignaturesHolder {
    fn signatures(&self, message_hash: &MessageHash) -> Vec<Vec<u8>> {
        SignaturesHolder::signatures(self, message_hash)
    }

    fn clear(&self) {
        SignaturesHolder::clear(self);
    }
}
