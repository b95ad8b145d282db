//! # Kasir Sync Agent
//!
//! Headless runner for the offline sync client.
//!
//! ## Usage
//! ```bash
//! # Run until Ctrl+C, config from the platform config dir
//! cargo run -p kasir-sync --bin kasir-agent
//!
//! # One cycle and exit (cron, manual flush)
//! cargo run -p kasir-sync --bin kasir-agent -- --once
//!
//! # Explicit config file
//! cargo run -p kasir-sync --bin kasir-agent -- --config ./sync.toml
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kasir_sync::{AgentStatus, RunOutcome, SyncAgent, SyncConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kasir=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut once = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--once" => once = true,
            "--help" | "-h" => {
                println!("Kasir POS Sync Agent");
                println!();
                println!("Usage: kasir-agent [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("      --once           Run one sync cycle and exit");
                println!("  -h, --help           Print help");
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let config = SyncConfig::load(config_path).context("loading sync config")?;
    let agent = SyncAgent::open(config)
        .await
        .context("opening local store")?;

    if once {
        match agent.run_once().await? {
            RunOutcome::Completed(report) => info!(
                sent = report.sent,
                synced = report.synced,
                failed = report.failed,
                "Sync finished"
            ),
            RunOutcome::Idle => info!("Nothing to sync"),
            RunOutcome::Busy => info!("Another sync is running"),
        }
        log_status(&agent.status().await);
        return Ok(());
    }

    let handle = agent.spawn();
    shutdown_signal().await;
    log_status(&handle.status().await);

    handle.shutdown().await?;
    Ok(())
}

fn log_status(status: &AgentStatus) {
    info!(
        pending = status.pending_count,
        synced = status.synced_count,
        dead_letters = status.dead_letter_count,
        "Agent status"
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
