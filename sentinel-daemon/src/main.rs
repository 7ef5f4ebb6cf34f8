//! sentinel-daemon entry point.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use sentinel_daemon::cli::DaemonCli;
use sentinel_daemon::logging;
use sentinel_daemon::orchestrator::{self, Orchestrator, RunOptions};

/// Grace period for blocking tasks (the stdin reader) after the daemon stops.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    let cli = DaemonCli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("sentinel-daemon: failed to build tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sentinel-daemon: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: DaemonCli) -> Result<()> {
    let config = orchestrator::load_config(cli.config.as_deref(), &cli).await?;

    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "sentinel-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run(RunOptions::from_cli(&cli)).await?;

    tracing::info!("sentinel-daemon shut down");
    Ok(())
}
