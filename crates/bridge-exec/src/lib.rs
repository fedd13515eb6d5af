//! This crate contains the executor the relay state machines act through.
//!
//! The [`executor::BridgeExecutor`] keeps the batch in flight for one direction and turns every
//! step request into calls on the chain clients, the leader topology, the batch validator and the
//! P2P signature store. All of those are reached through the traits in [`traits`], so the
//! concrete clients live in their own crate and tests run against in-memory doubles.
//!
//! Chain-B transactions are built, signed and followed by the [`tx_executor`].

pub mod config;
pub mod errors;
pub mod executor;
pub mod retries;
pub mod topology;
pub mod traits;
pub mod tx_executor;

#[cfg(test)]
mod test_utils;
