//! Bootstraps the status RPC server of the relayer.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bridge_relayer_common::status::{GeneralMetrics, MetricsHolder};
use bridge_relayer_rpc::RelayerStatusApiServer;
use jsonrpsee::{
    core::RpcResult,
    types::{ErrorCode, ErrorObjectOwned},
    RpcModule,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Starts the status server at `rpc_addr` and serves until `cancel` fires.
pub(crate) async fn start_rpc<T>(
    rpc_impl: &T,
    rpc_addr: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    T: RelayerStatusApiServer + Clone + Sync + Send,
{
    let mut rpc_module = RpcModule::new(rpc_impl.clone());

    let status_api = RelayerStatusApiServer::into_rpc(rpc_impl.clone());
    rpc_module.merge(status_api).context("merge status api")?;

    info!("starting relayer rpc server at {rpc_addr}");
    let rpc_server = jsonrpsee::server::ServerBuilder::new()
        .build(&rpc_addr)
        .await
        .context("build relayer rpc server")?;

    let rpc_handle = rpc_server.start(rpc_module);
    debug!("relayer rpc server started");

    cancel.cancelled().await;
    info!("stopping rpc server");

    if rpc_handle.stop().is_err() {
        warn!("rpc server already stopped");
    }

    Ok(())
}

/// Serves the metrics of every status handler.
#[derive(Debug, Clone)]
pub(crate) struct RelayerRpc {
    metrics: Arc<MetricsHolder>,
}

impl RelayerRpc {
    pub(crate) const fn new(metrics: Arc<MetricsHolder>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl RelayerStatusApiServer for RelayerRpc {
    async fn status_handlers(&self) -> RpcResult<Vec<String>> {
        Ok(self.metrics.available_status_handlers())
    }

    async fn metrics(&self, name: String) -> RpcResult<GeneralMetrics> {
        self.metrics
            .all_metrics(&name)
            .map_err(|e| rpc_error(ErrorCode::InvalidParams, &e.to_string(), name))
    }
}

fn rpc_error(err_code: ErrorCode, message: &str, data: String) -> ErrorObjectOwned {
    ErrorObjectOwned::owned::<_>(err_code.code(), message, Some(data))
}
