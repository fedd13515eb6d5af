#![allow(unreachable_pub)]
//! Testing utilities shared by the state machines of both directions.
//!
//! - [`executor`] - an in-memory executor scripting both chains
//! - [`transition`] - value-based transition testing helpers

pub mod executor;
pub mod transition;
