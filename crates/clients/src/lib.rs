//! Concrete collaborators of the bridge executor.
//!
//! Both chains are reached through a JSON-RPC gateway (see `bridge-relayer-rpc`). This crate
//! adapts the gateway to the executor's client traits, and provides the role providers the P2P
//! layer checks relayers against, the HTTP batch validator, and the Chain-B transaction plumbing.

pub mod availability;
pub mod chain_a;
pub mod chain_b;
pub mod config;
pub mod errors;
pub mod role_providers;
pub mod transactions;
pub mod validator;

use std::future::Future;

use bridge_relayer_exec::{errors::ClientError, traits::ClientResult};
use tokio_util::sync::CancellationToken;

/// Awaits a gateway call unless `cancel` fires first.
pub(crate) async fn call<T, F>(cancel: &CancellationToken, method: &str, request: F) -> ClientResult<T>
where
    F: Future<Output = Result<T, jsonrpsee::core::client::Error>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = request => result.map_err(|e| ClientError::Rpc(format!("{method}: {e}"))),
    }
}

#[cfg(test)]
mod test_utils;
