//! The checkpoint interface.

use async_trait::async_trait;
use primitive_types::U256;

use crate::errors::DbResult;

/// Persistent checkpoints of a relayer.
#[async_trait]
pub trait CheckpointDb: std::fmt::Debug + Send + Sync {
    /// Loads the last block index stored for `chain`, or zero if none was stored yet.
    async fn load_block_index(&self, chain: &str) -> DbResult<U256>;

    /// Stores the last block index observed on `chain`.
    async fn store_block_index(&self, chain: &str, index: U256) -> DbResult<()>;

    /// Loads the last nonce used by the P2P broadcaster, if any.
    async fn load_broadcast_nonce(&self) -> DbResult<Option<u64>>;

    /// Stores the last nonce used by the P2P broadcaster.
    async fn store_broadcast_nonce(&self, nonce: u64) -> DbResult<()>;
}
