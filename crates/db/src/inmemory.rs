//! In-memory checkpoints, used by tests and by relayers started without a working directory.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use primitive_types::U256;
use tokio::sync::RwLock;
use tracing::trace;

use crate::{checkpoint::CheckpointDb, errors::DbResult};

/// In-memory [`CheckpointDb`].
#[derive(Debug, Default, Clone)]
pub struct CheckpointDbInMemory {
    /// chain name -> block index
    block_indices: Arc<RwLock<HashMap<String, U256>>>,

    broadcast_nonce: Arc<RwLock<Option<u64>>>,
}

#[async_trait]
impl CheckpointDb for CheckpointDbInMemory {
    async fn load_block_index(&self, chain: &str) -> DbResult<U256> {
        Ok(self
            .block_indices
            .read()
            .await
            .get(chain)
            .copied()
            .unwrap_or_default())
    }

    async fn store_block_index(&self, chain: &str, index: U256) -> DbResult<()> {
        trace!(%chain, %index, "storing block index");
        self.block_indices
            .write()
            .await
            .insert(chain.to_string(), index);

        Ok(())
    }

    async fn load_broadcast_nonce(&self) -> DbResult<Option<u64>> {
        Ok(*self.broadcast_nonce.read().await)
    }

    async fn store_broadcast_nonce(&self, nonce: u64) -> DbResult<()> {
        *self.broadcast_nonce.write().await = Some(nonce);

        Ok(())
    }
}
