//! hushd - Alertmanager silence operator daemon.
//!
//! This binary scans a directory of silence manifests and reconciles each
//! declared silence against an Alertmanager instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hush_alertmanager::HttpSilenceApi;
use hush_reconcile::{InMemorySilenceStore, ReconcilerConfig, SilenceReconciler};
use hushd::{config::DaemonConfig, manifest, scanner, worker};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hushd")]
#[command(about = "Alertmanager silence operator daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon
    Run {
        /// Path to config file
        #[arg(short, long, default_value = "/etc/hushd/config.json")]
        config: PathBuf,
    },

    /// Validate the manifests in a directory without touching Alertmanager
    Check {
        /// Directory of silence manifests
        #[arg(short, long, default_value = "/etc/hushd/silences")]
        dir: PathBuf,
    },

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "/etc/hushd/config.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("hushd=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            run_daemon(config).await?;
        }

        Commands::Check { dir } => {
            check_manifests(&dir)?;
        }

        Commands::InitConfig { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

async fn run_daemon(config_path: PathBuf) -> anyhow::Result<()> {
    info!(config = %config_path.display(), "starting hushd");

    let config = DaemonConfig::from_file(&config_path)?;
    info!(
        alertmanager = %config.alertmanager_url,
        manifest_dir = %config.manifest_dir.display(),
        interval_secs = config.interval_secs,
        concurrency = config.concurrency,
        "loaded config"
    );

    let backend = Arc::new(HttpSilenceApi::new(
        &config.alertmanager_url,
        Duration::from_secs(config.request_timeout_secs),
    )?);
    let store = Arc::new(InMemorySilenceStore::new());

    let reconciler = Arc::new(SilenceReconciler::new(
        Arc::clone(&store),
        backend,
        ReconcilerConfig {
            interval_secs: config.interval_secs,
            silence_duration_secs: config.silence_duration_secs,
            author: config.author.clone(),
            instance: config.instance_name.clone(),
        },
    ));

    let (router, _workers) = worker::spawn_workers(
        reconciler,
        config.concurrency,
        Duration::from_secs(config.retry_delay_secs),
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
            _ = ticker.tick() => {
                match manifest::load_dir(&config.manifest_dir) {
                    Ok(manifests) => {
                        for id in scanner::sync_manifests(&store, &manifests) {
                            router.trigger(id);
                        }
                    }
                    Err(err) => {
                        warn!(dir = %config.manifest_dir.display(), error = %err,
                            "manifest scan failed");
                    }
                }
            }
        }
    }
}

fn check_manifests(dir: &Path) -> anyhow::Result<()> {
    let mut valid = 0usize;
    let mut invalid = 0usize;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        match manifest::load_file(&path) {
            Ok(m) => {
                println!("OK   {} ({})", path.display(), m.id());
                valid += 1;
            }
            Err(err) => {
                println!("FAIL {}: {}", path.display(), err);
                invalid += 1;
            }
        }
    }

    println!("{valid} valid, {invalid} invalid");

    if invalid > 0 {
        anyhow::bail!("{invalid} invalid manifest(s)");
    }
    Ok(())
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    let sample = serde_json::to_string_pretty(&DaemonConfig::sample())?;
    std::fs::write(output, sample + "\n")?;
    info!(path = %output.display(), "wrote sample config");
    Ok(())
}
