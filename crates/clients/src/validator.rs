//! The HTTP batch validator.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bridge_relayer_exec::{
    errors::ClientError,
    traits::{BatchValidator, ClientResult, DisabledBatchValidator},
};
use bridge_relayer_primitives::{batch::TransferBatch, types::Direction};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::BatchValidatorConfig;

/// Smallest accepted request timeout.
pub const MIN_REQUEST_TIME: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    valid: bool,
}

/// Asks an external service whether a batch may be relayed.
///
/// The batch JSON is posted to `<url>/<source>/<destination>`; the service answers
/// `{"valid": bool}`.
#[derive(Debug, Clone)]
pub struct HttpBatchValidator {
    client: reqwest::Client,
    url: String,
    request_time: Duration,
}

impl HttpBatchValidator {
    /// Creates the validator.
    pub fn new(url: impl Into<String>, request_time: Duration) -> ClientResult<Self> {
        if request_time < MIN_REQUEST_TIME {
            return Err(ClientError::Unavailable(format!(
                "batch validator request time {request_time:?} below {MIN_REQUEST_TIME:?}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            request_time,
        })
    }

    fn endpoint(&self, direction: Direction) -> String {
        format!(
            "{}/{}/{}",
            self.url,
            direction.source(),
            direction.destination()
        )
    }

    async fn request(&self, direction: Direction, batch: &TransferBatch) -> ClientResult<bool> {
        let response = self
            .client
            .post(self.endpoint(direction))
            .json(batch)
            .timeout(self.request_time)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ClientError::Rpc(e.to_string()))?;

        let body: ValidationResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        Ok(body.valid)
    }
}

#[async_trait]
impl BatchValidator for HttpBatchValidator {
    async fn validate_batch(
        &self,
        cancel: &CancellationToken,
        direction: Direction,
        batch: &TransferBatch,
    ) -> ClientResult<bool> {
        let valid = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            valid = self.request(direction, batch) => valid?,
        };
        debug!(batch_id = batch.id, %direction, %valid, "batch validated");

        Ok(valid)
    }
}

/// The validator described by `config`, accepting everything when disabled.
pub fn batch_validator(config: &BatchValidatorConfig) -> ClientResult<Arc<dyn BatchValidator>> {
    if !config.enabled {
        info!("batch validation is disabled");
        return Ok(Arc::new(DisabledBatchValidator));
    }

    Ok(Arc::new(HttpBatchValidator::new(
        config.url.clone(),
        config.request_time,
    )?))
}
