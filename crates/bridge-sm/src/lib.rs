//! This crate implements the state machines that relay batches between the two chains.
//!
//! Each direction is a small set of [`step::Step`]s sharing one executor. A step asks the executor
//! to observe or act on a chain and returns the step to run next; the [`state_machine`] runner
//! drives them one tick at a time. The executor traits in [`executor`], [`a_to_b::executor`] and
//! [`b_to_a::executor`] are the only contract between the steps and the outside world.

pub mod a_to_b;
pub mod b_to_a;
pub mod config;
pub mod errors;
pub mod executor;
mod multisig;
pub mod state_machine;
pub mod step;

#[cfg(test)]
pub(crate) mod testing;
