//! The bridge relayer relays token transfer batches between Chain-A and Chain-B.

use std::{fs, path::Path, process};

use bridge_relayer_common::logging::{self, LoggerConfig};
use clap::Parser;
use config::Config;
use constants::{DEFAULT_THREAD_COUNT, LOGS_DIR};
use serde::de::DeserializeOwned;
use tokio::runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

mod args;
mod bootstrap;
mod config;
mod constants;
mod keys;
mod rpc_server;

fn main() {
    let cli = args::Cli::parse();

    let mut config = parse_toml::<Config>(&cli.config);
    cli.apply_overrides(&mut config);

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    // the OTLP exporter needs a runtime to connect from
    {
        let _guard = runtime.enter();
        init_logging(&cli);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting bridge relayer");

    let cancel = CancellationToken::new();
    runtime.spawn(wait_for_signals(cancel.clone()));

    let result = runtime.block_on(bootstrap::run(config, cli.working_directory, cancel));
    runtime.shutdown_timeout(constants::SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => info!("bridge relayer shutdown complete"),
        Err(e) => {
            error!("bridge relayer crashed: {e:#}");
            process::exit(1);
        }
    }
}

fn init_logging(cli: &args::Cli) {
    let mut logger = LoggerConfig::with_base_name("bridge-relayer");
    logger.set_level(&cli.log_level);
    if cli.disable_ansi_color {
        logger.disable_ansi();
    }
    if cli.log_logger_name {
        logger.enable_logger_name();
    }
    if cli.log_save {
        logger.save_to_dir(cli.working_directory.join(LOGS_DIR));
    }
    if let Some(url) = cli.otlp_url.clone() {
        logger.set_otlp_url(url);
    }
    logging::init(logger).unwrap_or_else(|e| panic!("failed to initialize logging: {e}"));
}

/// Cancels `cancel` on ctrl-c or, on unix, SIGTERM.
async fn wait_for_signals(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(%e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
        _ = cancel.cancelled() => return,
    }

    cancel.cancel();
}

/// Reads and parses a TOML file from the given path into the given type `T`.
///
/// # Panics
///
/// 1. If the file is not readable.
/// 2. If the contents of the file cannot be deserialized into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> T
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    fs::read_to_string(path)
        .map(|p| {
            trace!(?p, "read file");

            let parsed = toml::from_str::<T>(&p).unwrap_or_else(|e| {
                panic!("failed to parse TOML file: {e:?}");
            });
            debug!(?parsed, "parsed TOML file");

            parsed
        })
        .unwrap_or_else(|e| {
            panic!("failed to read TOML file {}: {e}", path.display());
        })
}
