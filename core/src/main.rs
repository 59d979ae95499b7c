use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use holding_points_core::chain::AlloyChainClient;
use holding_points_core::config::Config;
use holding_points_core::db::Store;
use holding_points_core::indexer::Ingestor;
use holding_points_core::points::Calculator;
use holding_points_core::supervisor::Supervisor;

#[derive(Parser)]
#[command(name = "holding-points-indexer")]
struct Cli {
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

/// Loads configuration, connects the Store, and builds one Ingestor per
/// configured chain plus the Calculator. The outermost boundary for startup
/// failures: every collaborator's own error type is converted to
/// `anyhow::Error` here so `main` only has one failure shape to report.
async fn bootstrap(cli: &Cli) -> anyhow::Result<(Vec<(Ingestor, u64)>, Calculator)> {
    let cfg = Config::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    let store = Store::connect(&cfg.database)
        .await
        .context("failed to initialize store")?;

    let mut ingestors = Vec::with_capacity(cfg.chains.len());
    for chain in &cfg.chains {
        let client = AlloyChainClient::new(&chain.rpc_url)
            .with_context(|| format!("failed to build chain client for {}", chain.name))?;
        let ingestor = Ingestor::new(
            chain.id,
            chain.name.clone(),
            chain.contract_addr.clone(),
            Box::new(client),
            store.clone(),
            cfg.processor.reorg_threshold,
            cfg.processor.block_batch_size,
            cfg.processor.check_interval_seconds,
        );
        ingestors.push((ingestor, chain.start_block));
    }

    let chain_ids = cfg.chains.iter().map(|c| c.id).collect();
    let calculator = Calculator::new(store, chain_ids, cfg.points.calculation_interval_minutes);

    Ok((ingestors, calculator))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let (ingestors, calculator) = match bootstrap(&cli).await {
        Ok(v) => v,
        Err(e) => {
            error!(err = format!("{e:#}"), "fatal startup error");
            return std::process::ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    let mut signal_tasks = JoinSet::new();
    signal_tasks.spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received interrupt signal");
        signal_token.cancel();
    });
    #[cfg(unix)]
    {
        let signal_token = shutdown.clone();
        signal_tasks.spawn(async move {
            if let Ok(mut term) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                term.recv().await;
                info!("received terminate signal");
                signal_token.cancel();
            }
        });
    }

    let supervisor = Supervisor::new(ingestors, calculator);
    supervisor.run(shutdown).await;

    std::process::ExitCode::SUCCESS
}
