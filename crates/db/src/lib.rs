//! Checkpoints that let a relayer resume where it left off after a restart.
//!
//! Two values are persisted: the last block index observed on each chain and the last nonce the
//! P2P broadcaster signed with. Both are tiny, so they are kept as plain decimal files in the
//! relayer's working directory rather than in a database engine.

pub mod checkpoint;
pub mod constants;
pub mod errors;
pub mod inmemory;
pub mod persistent;
