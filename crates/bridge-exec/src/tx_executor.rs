//! Submits Chain-B transactions one at a time and optionally follows them until they are final.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use bridge_relayer_common::status::{StatusHandler, METRIC_NUM_SENT_TRANSACTIONS};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    errors::{ClientError, ExecutorError, ExecutorResult},
    traits::ClientResult,
};

/// Smallest accepted duration in [`TransactionChecksConfig`].
pub const MIN_CHECK_DURATION: Duration = Duration::from_millis(10);

/// A Chain-B transaction, in the form it is signed and sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Filled in by the nonce handler.
    pub nonce: u64,

    /// Always zero for relayer transactions.
    pub value: String,

    /// The contract the transaction calls.
    pub receiver: String,

    /// This relayer's address.
    pub sender: String,

    /// Filled in by the nonce handler.
    pub gas_price: u64,

    /// The gas the call may use.
    pub gas_limit: u64,

    /// The encoded contract call.
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,

    /// Hex encoded, empty while the payload is being signed.
    #[serde(default)]
    pub signature: String,

    /// The chain the transaction is valid on.
    pub chain_id: String,

    /// The transaction format version.
    pub version: u32,
}

/// The network parameters a transaction is built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The chain id.
    pub chain_id: String,

    /// The lowest transaction version the network accepts.
    pub min_transaction_version: u32,
}

/// The execution status of a sent transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Not executed yet.
    Pending,

    /// Executed with success.
    Success,

    /// Executed with a failure.
    Fail,

    /// The network does not know the transaction yet.
    NotFound,
}

/// Assigns nonces and gas prices and sends transactions.
#[async_trait]
pub trait NonceTransactionsHandler: Debug + Send + Sync {
    /// Sets the nonce and the gas price of `tx`, sent by `sender`.
    async fn apply_nonce_and_gas_price(
        &self,
        cancel: &CancellationToken,
        sender: &str,
        tx: &mut Transaction,
    ) -> ClientResult<()>;

    /// Sends a signed transaction. Returns its hash.
    async fn send_transaction(
        &self,
        cancel: &CancellationToken,
        tx: &Transaction,
    ) -> ClientResult<String>;
}

/// Signs transaction payloads with this relayer's Chain-B key.
pub trait TxSigner: Debug + Send + Sync {
    /// The address transactions are sent from.
    fn address(&self) -> String;

    /// Signs the serialized transaction.
    fn sign(&self, payload: &[u8]) -> ClientResult<Vec<u8>>;
}

/// Read access to the Chain-B network.
#[async_trait]
pub trait TxProxy: Debug + Send + Sync {
    /// The current network parameters.
    async fn network_config(&self, cancel: &CancellationToken) -> ClientResult<NetworkConfig>;

    /// The execution status of the transaction with hash `hash`.
    async fn process_transaction_status(
        &self,
        cancel: &CancellationToken,
        hash: &str,
    ) -> ClientResult<TxStatus>;

    /// The full transaction with hash `hash`, including its results.
    async fn get_transaction(
        &self,
        cancel: &CancellationToken,
        hash: &str,
    ) -> ClientResult<serde_json::Value>;
}

/// How sent transactions are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionChecksConfig {
    /// Whether sent transactions are followed until they are final.
    pub check_transaction_results: bool,

    /// Interval between two status queries.
    pub time_between_checks: Duration,

    /// How long a transaction may stay pending.
    pub execution_timeout: Duration,

    /// Whether a failed transaction shuts the relayer down.
    pub close_app_on_error: bool,

    /// Pause after a failed transaction.
    pub extra_delay_on_error: Duration,
}

impl TransactionChecksConfig {
    /// Fails if checks are enabled with a duration below its minimum.
    pub fn validate(&self) -> ExecutorResult<()> {
        if !self.check_transaction_results {
            warn!("transaction checks are disabled, a repeated failure may drain the relayer funds");
            return Ok(());
        }

        for (name, value) in [
            ("time_between_checks", self.time_between_checks),
            ("execution_timeout", self.execution_timeout),
        ] {
            if value < MIN_CHECK_DURATION {
                return Err(ExecutorError::InvalidDuration {
                    name,
                    value,
                    min: MIN_CHECK_DURATION,
                });
            }
        }

        Ok(())
    }
}

/// Arguments for [`TransactionExecutor::new`].
#[derive(Debug)]
pub struct TransactionExecutorArgs {
    /// Network access.
    pub proxy: Arc<dyn TxProxy>,

    /// Nonce management and sending.
    pub nonce_handler: Arc<dyn NonceTransactionsHandler>,

    /// The Chain-B key.
    pub signer: Arc<dyn TxSigner>,

    /// Result checks.
    pub checks: TransactionChecksConfig,

    /// Cancelled on a failed transaction when `checks.close_app_on_error` is set.
    pub shutdown: CancellationToken,

    /// Receives the sent transactions count.
    pub status_handler: Option<Arc<dyn StatusHandler>>,
}

/// Builds, signs and sends Chain-B transactions.
///
/// Nonce assignment, signing and sending happen under one lock so two concurrent callers never
/// race for the same nonce.
#[derive(Debug)]
pub struct TransactionExecutor {
    proxy: Arc<dyn TxProxy>,
    nonce_handler: Arc<dyn NonceTransactionsHandler>,
    signer: Arc<dyn TxSigner>,
    checks: TransactionChecksConfig,
    shutdown: CancellationToken,
    status_handler: Option<Arc<dyn StatusHandler>>,
    num_sent_transactions: AtomicU64,
    critical_section: Mutex<()>,
}

impl TransactionExecutor {
    /// Creates the executor after validating `args.checks`.
    pub fn new(args: TransactionExecutorArgs) -> ExecutorResult<Self> {
        args.checks.validate()?;

        Ok(Self {
            proxy: args.proxy,
            nonce_handler: args.nonce_handler,
            signer: args.signer,
            checks: args.checks,
            shutdown: args.shutdown,
            status_handler: args.status_handler,
            num_sent_transactions: AtomicU64::new(0),
            critical_section: Mutex::new(()),
        })
    }

    /// Sends a call to `receiver` and, if configured, waits for its outcome.
    ///
    /// Returns the transaction hash.
    pub async fn execute_transaction(
        &self,
        cancel: &CancellationToken,
        receiver: &str,
        kind: &str,
        gas_limit: u64,
        data: Vec<u8>,
    ) -> ClientResult<String> {
        let network = self.proxy.network_config(cancel).await?;
        let mut tx = Transaction {
            value: "0".to_string(),
            receiver: receiver.to_string(),
            sender: self.signer.address(),
            gas_limit,
            data,
            chain_id: network.chain_id,
            version: network.min_transaction_version,
            ..Default::default()
        };

        let hash = self.send_in_critical_section(cancel, &mut tx).await?;
        info!(
            %kind,
            %hash,
            nonce = tx.nonce,
            data = %hex::encode(&tx.data),
            %gas_limit,
            sender = %tx.sender,
            "sent transaction"
        );

        self.num_sent_transactions.fetch_add(1, Ordering::Relaxed);
        if let Some(handler) = &self.status_handler {
            handler.add_int_metric(METRIC_NUM_SENT_TRANSACTIONS, 1);
        }

        self.handle_results(cancel, &hash).await?;
        Ok(hash)
    }

    /// The number of transactions sent so far.
    pub fn num_sent_transactions(&self) -> u64 {
        self.num_sent_transactions.load(Ordering::Relaxed)
    }

    async fn send_in_critical_section(
        &self,
        cancel: &CancellationToken,
        tx: &mut Transaction,
    ) -> ClientResult<String> {
        let _guard = self.critical_section.lock().await;

        let sender = tx.sender.clone();
        self.nonce_handler
            .apply_nonce_and_gas_price(cancel, &sender, tx)
            .await?;
        self.sign(tx)?;
        self.nonce_handler.send_transaction(cancel, tx).await
    }

    fn sign(&self, tx: &mut Transaction) -> ClientResult<()> {
        tx.signature.clear();
        let payload =
            serde_json::to_vec(tx).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let signature = self.signer.sign(&payload)?;
        tx.signature = hex::encode(signature);

        Ok(())
    }

    async fn handle_results(&self, cancel: &CancellationToken, hash: &str) -> ClientResult<()> {
        if !self.checks.check_transaction_results {
            return Ok(());
        }

        let result = match tokio::time::timeout(
            self.checks.execution_timeout,
            self.check_results_until_done(cancel, hash),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::TransactionFailed(format!(
                "{hash} not executed after {:?}",
                self.checks.execution_timeout
            ))),
        };

        if let Err(e) = &result {
            if *e != ClientError::Cancelled {
                self.handle_error();
                self.wait_extra_delay(cancel).await;
            }
        }

        result
    }

    async fn check_results_until_done(
        &self,
        cancel: &CancellationToken,
        hash: &str,
    ) -> ClientResult<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = tokio::time::sleep(self.checks.time_between_checks) => {}
            }

            match self.proxy.process_transaction_status(cancel, hash).await? {
                TxStatus::Success => return Ok(()),
                TxStatus::Pending | TxStatus::NotFound => {
                    debug!(%hash, "transaction not final yet");
                }
                TxStatus::Fail => {
                    self.log_full_transaction(cancel, hash).await;
                    return Err(ClientError::TransactionFailed(hash.to_string()));
                }
            }
        }
    }

    async fn log_full_transaction(&self, cancel: &CancellationToken, hash: &str) {
        let tx = match self.proxy.get_transaction(cancel, hash).await {
            Ok(tx) => tx,
            Err(e) => {
                error!(%e, "could not fetch the failed transaction");
                return;
            }
        };

        match serde_json::to_string_pretty(&tx) {
            Ok(details) => error!(%hash, %details, "transaction failed"),
            Err(e) => error!(%e, "could not format the failed transaction"),
        }
    }

    fn handle_error(&self) {
        if self.checks.close_app_on_error {
            error!("closing the relayer after a failed transaction");
            self.shutdown.cancel();
        }
    }

    async fn wait_extra_delay(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.checks.extra_delay_on_error) => {}
        }
    }
}
