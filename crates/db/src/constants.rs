//! File names used by the file-backed checkpoints.

/// Extension of the per-chain block index files, named `.<chain>.block`.
pub const BLOCK_INDEX_FILE_EXTENSION: &str = "block";

/// Name of the file holding the last broadcast nonce.
pub const BROADCAST_NONCE_FILE_NAME: &str = ".p2p.nonce";

/// Unix permissions of every checkpoint file.
pub const CHECKPOINT_FILE_MODE: u32 = 0o600;
