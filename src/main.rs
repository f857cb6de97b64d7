use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use sysops_checks::aggregator::Aggregator;
use sysops_checks::api::{ReqwestFactory, SessionCache};
use sysops_checks::check::{self, Check};
use sysops_checks::config::Config;
use sysops_checks::emitter::Dispatcher;

#[derive(Parser, Debug)]
#[command(name = "sysops-checks", about = "Fabric controller and stats endpoint checks")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/sysops-checks/config.toml")]
    config: String,

    /// Validate config and exit
    #[arg(long)]
    check: bool,

    /// Print version and exit
    #[arg(short, long)]
    version: bool,

    /// Run every check once, emit the results and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main(worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("sysops-checks {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = Config::load(&cli.config)?;

    if cli.check {
        println!("Configuration is valid.");
        return Ok(());
    }

    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        hostname = %config.agent.hostname,
        "Starting SysOps Checks"
    );

    let result = if cli.once { run_once(config).await } else { run(config).await };
    if let Err(e) = result {
        error!(error = %e, "Agent terminated with error");
        return Err(e);
    }

    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.agent.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

fn setup(config: &Config) -> Result<(Vec<Box<dyn Check>>, Dispatcher)> {
    // Shared by every fabric check for the life of the process
    let cache = Arc::new(SessionCache::new());
    let checks = check::create_checks(config, cache, Arc::new(ReqwestFactory))?;
    let dispatcher = Dispatcher::new(&config.output, &config.agent.hostname)?;
    Ok((checks, dispatcher))
}

async fn run_once(config: Config) -> Result<()> {
    let (checks, dispatcher) = setup(&config)?;

    let mut failed = 0usize;
    for mut c in checks {
        let mut aggregator = Aggregator::new();
        if let Err(e) = c.run(&mut aggregator).await {
            tracing::warn!(check = c.name(), error = %e, "Check failed");
            failed += 1;
        }
        dispatcher.dispatch(&aggregator.drain()).await;
    }

    if failed > 0 {
        anyhow::bail!("{} check(s) failed", failed);
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let (checks, dispatcher) = setup(&config)?;

    let (batch_tx, mut batch_rx) = tokio::sync::mpsc::channel(1_000);

    // Spawn check tasks
    for mut c in checks {
        let tx = batch_tx.clone();
        tokio::spawn(async move {
            let mut aggregator = Aggregator::new();
            loop {
                let interval = c.interval_secs();
                if let Err(e) = c.run(&mut aggregator).await {
                    tracing::warn!(check = c.name(), error = %e, "Check failed");
                }
                // Service checks are submitted on failure too, so always flush
                if tx.send(aggregator.drain()).await.is_err() {
                    return; // Channel closed
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
            }
        });
    }
    drop(batch_tx);

    // Spawn emitter task
    tokio::spawn(async move {
        while let Some(batch) = batch_rx.recv().await {
            dispatcher.dispatch(&batch).await;
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, exiting");

    Ok(())
}
