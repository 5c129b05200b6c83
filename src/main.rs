//! Pallet quality worker - main entry point

use clap::{Parser, Subcommand};
use pallet_worker::config::WorkerConfig;
use pallet_worker::observability::init_default_logging;
use pallet_worker::transport::mqtt::MqttError;
use pallet_worker::worker::forward_shutdown_signal;
use pallet_worker::{WorkerError, WorkerLifecycle};
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Pallet quality worker
#[derive(Parser)]
#[command(name = "pallet-worker")]
#[command(about = "Analyzes new pallets announced over MQTT and reports results to the Quality API")]
#[command(version)]
struct Cli {
    /// Configuration file path; environment variables override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker (default)
    Run,
    /// Validate configuration
    Config {
        /// Print the resolved configuration with secrets masked
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_default_logging() {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!("Starting pallet worker v{}", env!("CARGO_PKG_VERSION"));

    let config = match WorkerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_worker(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    match result {
        Ok(()) => info!("Application shutdown complete"),
        // Already logged by the lifecycle; an unreachable broker is not a crash
        Err(WorkerError::Connect(MqttError::ConnectionFailed(_))) => {}
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

async fn run_worker(config: WorkerConfig) -> Result<(), WorkerError> {
    let mut worker = WorkerLifecycle::new(&config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(forward_shutdown_signal(
        wait_for_shutdown_signal(),
        shutdown_tx,
    ));

    worker.run(shutdown_rx).await
}

/// Resolves to `true` on SIGINT or SIGTERM, `false` if neither can be received
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> bool {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        received = wait_for_ctrl_c() => {
            if received {
                return true;
            }
        }
        Some(()) = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
            return true;
        }
    }

    // SIGINT unavailable; SIGTERM still is
    if sigterm.recv().await.is_some() {
        info!("Received SIGTERM, shutting down gracefully...");
        return true;
    }
    false
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> bool {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> bool {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received SIGINT, shutting down gracefully...");
            true
        }
        Err(e) => {
            error!("Failed to listen for SIGINT: {}", e);
            false
        }
    }
}

fn handle_config_command(config: &WorkerConfig, show: bool) -> Result<(), WorkerError> {
    if show {
        let rendered = toml::to_string_pretty(&config.masked()).map_err(|e| {
            pallet_worker::ConfigError::InvalidConfig(format!("cannot render configuration: {e}"))
        })?;
        println!("Current configuration:");
        println!("{rendered}");
    }

    info!("Configuration validation complete");
    Ok(())
}
