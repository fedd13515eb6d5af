use std::time::Duration;

pub(crate) const DEFAULT_THREAD_COUNT: u8 = 4;

/// Subdirectory of the working directory the log files are saved in.
pub(crate) const LOGS_DIR: &str = "logs";

/// Value of `--rest-api-interface` that disables the status server.
pub(crate) const REST_API_DISABLED: &str = "off";

/// Status handler counting the Chain-B transactions.
pub(crate) const TRANSACTIONS_STATUS_HANDLER_NAME: &str = "chain-b-transactions";

/// Grace period for the background tasks once shutdown started.
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
