//! Wires the relayer together and runs it until shutdown.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use bridge_relayer_clients::{
    availability::AvailabilityTracker,
    chain_a::JsonRpcChainAClient,
    chain_b::{ChainBClientArgs, JsonRpcChainBClient},
    role_providers::{
        spawn_polling, EthereumRoleProvider, Refreshable, RelayersFetcher, WhitelistRoleProvider,
    },
    transactions::{GatewayTransactions, KeypairTxSigner},
    validator::batch_validator,
};
use bridge_relayer_common::status::{
    InMemoryStatusHandler, MetricsHolder, StatusHandler, A_TO_B_STATUS_HANDLER_NAME,
    B_TO_A_STATUS_HANDLER_NAME,
};
use bridge_relayer_db::{checkpoint::CheckpointDb, persistent::FileCheckpointDb};
use bridge_relayer_exec::{
    executor::{BridgeExecutor, BridgeExecutorArgs},
    topology::RoundRobinTopology,
    traits::{BatchValidator, DisabledBatchValidator},
    tx_executor::{TransactionExecutor, TransactionExecutorArgs, TxSigner},
};
use bridge_relayer_p2p_service::{
    antiflood::AntifloodHandler, bootstrap as bootstrap_p2p, denial::PeerDenialEvaluator,
    Broadcaster, BroadcasterArgs, Configuration, JoinSchedule, RelayerKeypair, RoleProvider,
    SignaturesHolder,
};
use bridge_relayer_primitives::types::{Direction, EthAddress, RelayerPubKey};
use bridge_relayer_sm::{a_to_b, b_to_a, errors::StateMachineError};
use jsonrpsee::http_client::HttpClientBuilder;
use libp2p::Multiaddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::{Config, P2PConfig},
    constants::TRANSACTIONS_STATUS_HANDLER_NAME,
    keys::load_keypair,
    rpc_server::{start_rpc, RelayerRpc},
};

/// Runs the relayer until `cancel` fires or a state machine halts.
pub(crate) async fn run(
    config: Config,
    working_dir: PathBuf,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let keypair = load_keypair(&working_dir, &config.relayer.private_key_file)?;
    info!(public_key = %keypair.relayer_pubkey(), "loaded relayer key");

    let checkpoints: Arc<dyn CheckpointDb> = Arc::new(FileCheckpointDb::new(&working_dir));
    let metrics = Arc::new(MetricsHolder::new());
    let a_to_b_status = status_handler(&metrics, A_TO_B_STATUS_HANDLER_NAME)?;
    let b_to_a_status = status_handler(&metrics, B_TO_A_STATUS_HANDLER_NAME)?;
    let tx_status = status_handler(&metrics, TRANSACTIONS_STATUS_HANDLER_NAME)?;

    let chain_a = Arc::new(
        JsonRpcChainAClient::connect(
            &config.chain_a.network_address,
            *keypair.secret_key(),
            AvailabilityTracker::with_checkpoints(
                Direction::AToB.source(),
                config.chain_a.allow_delta,
                checkpoints.clone(),
            )
            .await?,
        )
        .context("chain A client")?,
    );
    info!(address = %chain_a.address(), "chain A client ready");

    let chain_b = Arc::new(
        chain_b_client(&config, &keypair, checkpoints.clone(), tx_status, cancel.clone()).await?,
    );

    // whitelists are filled before the p2p node starts so early messages are not dropped
    let whitelist = Arc::new(WhitelistRoleProvider::default());
    refresh::<RelayerPubKey>(whitelist.as_ref(), chain_b.as_ref(), &cancel)
        .await
        .context("initial chain B relayers")?;
    let eth_whitelist = Arc::new(EthereumRoleProvider::default());
    refresh::<EthAddress>(eth_whitelist.as_ref(), chain_a.as_ref(), &cancel)
        .await
        .context("initial chain A relayers")?;
    if !whitelist.is_whitelisted(&keypair.relayer_pubkey()) {
        warn!("this relayer is not whitelisted on chain B yet");
    }

    let mut tasks: Vec<JoinHandle<()>> = vec![
        spawn_polling::<RelayerPubKey>(
            "chain-b-relayers",
            whitelist.clone(),
            chain_b.clone(),
            config.relayer.role_provider_polling,
            cancel.child_token(),
        ),
        spawn_polling::<EthAddress>(
            "chain-a-relayers",
            eth_whitelist.clone(),
            chain_a.clone(),
            config.chain_a.relayers_polling,
            cancel.child_token(),
        ),
    ];

    let denial_evaluator = Arc::new(PeerDenialEvaluator::new());
    let (handle, runner) = bootstrap_p2p(
        &p2p_configuration(&config.p2p, &keypair)?,
        denial_evaluator.clone(),
        cancel.child_token(),
    )?;

    let antiflood = Arc::new(if config.p2p.antiflood.enabled {
        AntifloodHandler::new(&config.p2p.antiflood)?
    } else {
        AntifloodHandler::disabled()
    });
    tasks.push(antiflood.clone().spawn_reset_task(cancel.child_token()));

    let broadcaster = Arc::new(
        Broadcaster::new(BroadcasterArgs {
            name: config.p2p.name.clone(),
            keypair: keypair.clone(),
            messenger: Arc::new(handle),
            role_provider: whitelist.clone(),
            signature_processor: eth_whitelist,
            antiflood,
            denial_evaluator,
            invalid_message_blacklist_duration: config.p2p.invalid_message_blacklist_duration,
            nonce_store: Some(checkpoints),
        })
        .await?,
    );
    let holder = Arc::new(SignaturesHolder::new());
    broadcaster.add_broadcast_client(holder.clone());
    broadcaster.register_on_topics()?;
    tasks.push(runner.spawn(broadcaster.clone()));
    let schedule = JoinSchedule::new(
        config.relayer.time_for_bootstrap,
        config.relayer.time_before_repeat_join,
    )?;
    tasks.push(broadcaster.clone().spawn_join_task(schedule, cancel.child_token()));

    let topology = Arc::new(RoundRobinTopology::new(
        keypair.relayer_pubkey(),
        whitelist,
        config.relayer.topology_step_duration,
    ));
    let validator: Arc<dyn BatchValidator> = match &config.batch_validator {
        Some(validator) => batch_validator(validator)?,
        None => Arc::new(DisabledBatchValidator),
    };

    let executor_args = |direction: Direction, status_handler: Arc<dyn StatusHandler>| {
        BridgeExecutorArgs {
            name: status_handler.name().to_string(),
            direction,
            chain_a: chain_a.clone(),
            chain_b: chain_b.clone(),
            topology: topology.clone(),
            validator: validator.clone(),
            broadcaster: broadcaster.clone(),
            signatures: holder.clone(),
            status_handler,
            config: config.executor,
        }
    };

    let a_to_b = a_to_b::create_state_machine(
        A_TO_B_STATUS_HANDLER_NAME,
        BridgeExecutor::new(executor_args(Direction::AToB, a_to_b_status.clone()))?,
    )?
    .with_status_handler(a_to_b_status);
    let b_to_a = b_to_a::create_state_machine(
        B_TO_A_STATUS_HANDLER_NAME,
        BridgeExecutor::new(executor_args(Direction::BToA, b_to_a_status.clone()))?,
    )?
    .with_status_handler(b_to_a_status);

    let machines = [
        spawn_runner(
            A_TO_B_STATUS_HANDLER_NAME,
            a_to_b.run(config.state_machine.a_to_b, cancel.child_token()),
            cancel.clone(),
        ),
        spawn_runner(
            B_TO_A_STATUS_HANDLER_NAME,
            b_to_a.run(config.state_machine.b_to_a, cancel.child_token()),
            cancel.clone(),
        ),
    ];

    if let Some(addr) = config.rpc_addr() {
        let addr = addr.to_string();
        let rpc = RelayerRpc::new(metrics);
        let rpc_cancel = cancel.child_token();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = start_rpc(&rpc, &addr, rpc_cancel).await {
                error!(%e, "rpc server failed");
            }
        }));
    } else {
        info!("status rpc server disabled");
    }

    info!("relayer started");
    cancel.cancelled().await;
    info!("shutting down");
    broadcaster.close();

    let mut failure = None;
    for machine in machines {
        match machine.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failure = Some(anyhow::Error::from(e)),
            Err(e) => failure = Some(anyhow::Error::from(e).context("state machine task")),
        }
    }
    for task in tasks {
        if let Err(e) = task.await {
            warn!(%e, "background task did not stop cleanly");
        }
    }

    failure.map_or(Ok(()), Err)
}

fn status_handler(
    metrics: &MetricsHolder,
    name: &str,
) -> anyhow::Result<Arc<dyn StatusHandler>> {
    let handler: Arc<dyn StatusHandler> = Arc::new(InMemoryStatusHandler::new(name));
    metrics.add_status_handler(handler.clone())?;
    Ok(handler)
}

async fn chain_b_client(
    config: &Config,
    keypair: &RelayerKeypair,
    checkpoints: Arc<dyn CheckpointDb>,
    status_handler: Arc<dyn StatusHandler>,
    shutdown: CancellationToken,
) -> anyhow::Result<JsonRpcChainBClient> {
    let url = &config.chain_b.network_address;
    let client = HttpClientBuilder::default()
        .build(url)
        .with_context(|| format!("chain B gateway {url}"))?;

    let transactions = Arc::new(GatewayTransactions::new(client.clone()));
    let signer = Arc::new(KeypairTxSigner::new(Arc::new(keypair.clone())));
    let relayer_address = signer.address();

    let executor = TransactionExecutor::new(TransactionExecutorArgs {
        proxy: transactions.clone(),
        nonce_handler: transactions,
        signer,
        checks: config.chain_b.transaction_checks,
        shutdown,
        status_handler: Some(status_handler),
    })?;

    let availability = AvailabilityTracker::with_checkpoints(
        Direction::AToB.destination(),
        config.chain_b.allow_delta,
        checkpoints,
    )
    .await?;

    info!(%relayer_address, multisig = %config.chain_b.multisig_address, "chain B client ready");
    Ok(JsonRpcChainBClient::new(ChainBClientArgs {
        client,
        executor: Arc::new(executor),
        multisig_address: config.chain_b.multisig_address.clone(),
        relayer_address,
        gas_limits: config.chain_b.gas_limits,
        availability,
    }))
}

async fn refresh<T>(
    provider: &dyn Refreshable<T>,
    fetcher: &dyn RelayersFetcher<T>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let entries = fetcher.fetch_relayers(cancel).await?;
    provider.refresh(entries)?;
    Ok(())
}

fn p2p_configuration(config: &P2PConfig, keypair: &RelayerKeypair) -> anyhow::Result<Configuration> {
    let listening_addr = config
        .listening_addr
        .parse::<Multiaddr>()
        .with_context(|| format!("listening address {}", config.listening_addr))?;
    let connect_to = config
        .connect_to
        .iter()
        .map(|addr| {
            addr.parse::<Multiaddr>()
                .with_context(|| format!("peer address {addr}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut configuration = Configuration::new(keypair.clone(), listening_addr, connect_to);
    configuration.idle_connection_timeout = config.idle_connection_timeout;
    configuration.heartbeat_interval = config.heartbeat_interval;
    Ok(configuration)
}

/// Spawns a state machine runner; a halted machine shuts the whole relayer down.
fn spawn_runner(
    name: &'static str,
    runner: impl std::future::Future<Output = Result<(), StateMachineError>> + Send + 'static,
    shutdown: CancellationToken,
) -> JoinHandle<Result<(), StateMachineError>> {
    tokio::spawn(async move {
        let result = runner.await;
        if let Err(e) = &result {
            error!(%name, %e, "state machine halted, shutting down");
            shutdown.cancel();
        }

        result
    })
}
