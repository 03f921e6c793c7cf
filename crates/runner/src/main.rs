//! # hermes
//!
//! Entry point for the Hermes trading engine. Loads a JSON configuration,
//! wires the engine against an exchange adapter, and runs until Ctrl+C.
//!
//! The live venue adapter is provided by the deployment; this binary
//! ships with the in-memory simulated venue, which `--dry-run` uses to
//! exercise every path without submitting real orders.
//!
//! ```bash
//! hermes --config config.json --dry-run
//! hermes --config config.json --check-config
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hermes_core::{CancelHandle, SystemClock};
use hermes_gateway::{ExchangeAdapter, SimAdapter, SimBehavior};
use hermes_runner::{config::EngineConfig, engine::Engine, logging};
use tracing::info;

/// Hermes perpetual-futures trading engine.
#[derive(Parser)]
#[command(name = "hermes", about = "Hybrid maker/taker trading engine")]
struct Cli {
    /// Configuration file path (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Exercise the full pipeline against the simulated venue; no real
    /// order submission.
    #[arg(long)]
    dry_run: bool,

    /// Parse and validate the configuration, then exit.
    #[arg(long)]
    check_config: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.check_config {
        // No logging yet: the outcome is the process exit code.
        let config = EngineConfig::load(&cli.config)?;
        println!(
            "config ok: {} symbol(s), strategy {:?}",
            config.symbols.len(),
            config.execution.strategy
        );
        return Ok(());
    }

    logging::init_logging(&cli.log_level);
    let config = EngineConfig::load(&cli.config)?;
    info!(
        config = %cli.config.display(),
        symbols = ?config.symbol_names(),
        dry_run = cli.dry_run,
        "hermes starting"
    );

    // The wire adapter to a live venue comes from the deployment layer
    // (credentials and endpoints never reach the core). Both the default
    // build and --dry-run wire the simulated venue.
    let adapter: Arc<dyn ExchangeAdapter> =
        Arc::new(SimAdapter::new(SimBehavior::NeverFill));

    let clock = Arc::new(SystemClock);
    let engine = Engine::new(config, adapter, clock)?;

    let (handle, token) = CancelHandle::new();
    let engine_task = tokio::spawn(engine.run(token));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, cancelling");
    handle.cancel();

    engine_task.await?;
    info!("goodbye");
    Ok(())
}
