use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use homestate::home::load_snapshot;
use homestate::home::JsonFileStore;
use homestate::Config;
use homestate::Home;
use homestate::HomeSnapshot;

/// Config file used when `--config` isn't given, if it exists
const DEFAULT_CONFIG: &str = "homestate.toml";

#[derive(Debug, Parser)]
#[command(version, about = "Serve simulated smart home state over HTTP")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(long)]
    listen: Option<String>,

    /// Port to listen on, overriding the config file
    #[arg(short, long)]
    port: Option<u16>,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(DEFAULT_CONFIG)?,
        None => Config::default(),
    };

    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    homestate::telemetry::init(&config.logging, &config.audit)?;
    tracing::info!("homestate starting");

    let snapshot = match config.storage.startup_source() {
        Some(path) => {
            tracing::info!("Loading home state from {}", path.display());
            load_snapshot(path)
                .with_context(|| format!("Failed to load home state from {}", path.display()))?
        }
        None => {
            tracing::info!("No seed document configured, starting from defaults");
            HomeSnapshot::default()
        }
    };
    tracing::info!(
        "Loaded {} fixture(s), thermostat {} at {}",
        snapshot.fixtures.len(),
        snapshot.thermostat.status,
        snapshot.thermostat.temp_setting
    );

    let store = JsonFileStore::new(config.storage.data.clone());
    tracing::info!("Saving changes to {}", store.path().display());
    let home = Arc::new(Home::new(snapshot, store));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received shutdown signal"),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown_tx.send(()).ok();
    });

    homestate::api::serve(
        config.server.listen.clone(),
        config.server.port,
        home,
        shutdown_rx,
    )
    .await
    .context("HTTP API server failed")?;

    tracing::info!("homestate shutdown complete");
    Ok(())
}
