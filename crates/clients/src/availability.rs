//! Detects a chain that stopped producing blocks.

use std::sync::Arc;

use bridge_relayer_db::checkpoint::CheckpointDb;
use bridge_relayer_exec::{errors::ClientError, traits::ClientResult};
use parking_lot::Mutex;
use primitive_types::U256;
use tracing::{debug, warn};

/// Counts how many availability checks in a row observed the same block.
///
/// A chain is reported unavailable once the same block was seen more than `allow_delta` times.
/// Every new block is checkpointed so a restarted relayer starts from the last block it saw.
pub struct AvailabilityTracker {
    chain: String,
    allow_delta: u64,
    state: Mutex<Observed>,
    checkpoints: Option<Arc<dyn CheckpointDb>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Observed {
    block: U256,
    repeats: u64,
}

impl std::fmt::Debug for AvailabilityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityTracker")
            .field("chain", &self.chain)
            .field("allow_delta", &self.allow_delta)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl AvailabilityTracker {
    /// Creates a tracker without checkpoints.
    pub fn new(chain: impl Into<String>, allow_delta: u64) -> Self {
        Self {
            chain: chain.into(),
            allow_delta,
            state: Mutex::new(Observed::default()),
            checkpoints: None,
        }
    }

    /// Creates a tracker seeded with the last block checkpointed for `chain`.
    pub async fn with_checkpoints(
        chain: impl Into<String>,
        allow_delta: u64,
        checkpoints: Arc<dyn CheckpointDb>,
    ) -> ClientResult<Self> {
        let chain = chain.into();
        let block = checkpoints
            .load_block_index(&chain)
            .await
            .map_err(|e| ClientError::Unavailable(format!("checkpoint: {e}")))?;
        debug!(%chain, %block, "loaded block checkpoint");

        Ok(Self {
            chain,
            allow_delta,
            state: Mutex::new(Observed { block, repeats: 0 }),
            checkpoints: Some(checkpoints),
        })
    }

    /// The last block observed.
    pub fn last_block(&self) -> U256 {
        self.state.lock().block
    }

    /// Records `block` as the current head and fails if it did not move for too long.
    pub async fn observe(&self, block: U256) -> ClientResult<()> {
        let (moved, repeats) = {
            let mut state = self.state.lock();
            if state.block != block {
                *state = Observed { block, repeats: 0 };
                (true, 0)
            } else {
                state.repeats += 1;
                (false, state.repeats)
            }
        };

        if moved {
            if let Some(checkpoints) = &self.checkpoints {
                if let Err(e) = checkpoints.store_block_index(&self.chain, block).await {
                    warn!(chain = %self.chain, %block, %e, "could not store block checkpoint");
                }
            }
            return Ok(());
        }

        if repeats > self.allow_delta {
            return Err(ClientError::Unavailable(format!(
                "{}: block {block} fetched {repeats} times in a row",
                self.chain
            )));
        }

        Ok(())
    }
}
