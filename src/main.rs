use anyhow::Result;
use clap::Parser;
use speedlog::config::AppConfig;
use speedlog::provider::{CommandProvider, ConfiguredProvider};
use speedlog::result_store::ResultStore;
use speedlog::{logging, scheduler, version};
use std::path::PathBuf;
use std::sync::Arc;

/// Measures network speed now and then on a fixed interval, appending each result to a CSV file.
#[derive(Parser)]
#[command(name = "speedlog", version)]
struct Cli {
    /// TOML config file (falls back to CONFIG_FILE, then ./speedlog.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Result store path, overriding store.path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Seconds between measurements, overriding scheduler.interval_secs
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app_config = AppConfig::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        app_config.store.path = store;
    }
    if let Some(secs) = cli.interval_secs {
        app_config.scheduler.interval_secs = secs;
    }
    app_config.validate()?;
    let _log_guard = logging::init("info", version::NAME, &app_config.logging)?;

    tracing::info!(
        version = %version::banner(),
        store = %app_config.store.path.display(),
        interval_secs = app_config.scheduler.interval_secs,
        command = %app_config.provider.command,
        "starting speed logger"
    );

    let provider = Arc::new(ConfiguredProvider::new(
        CommandProvider::new(
            app_config.provider.command.clone(),
            app_config.provider.args.clone(),
        ),
        app_config.scheduler.measurement_timeout(),
    ));
    let store = ResultStore::new(app_config.store.path.clone());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let scheduler_handle = scheduler::spawn(
        scheduler::SchedulerDeps {
            provider,
            store,
            shutdown_rx,
        },
        scheduler::SchedulerConfig {
            interval: app_config.scheduler.interval(),
        },
    );

    shutdown_signal().await;
    tracing::info!("Received shutdown signal; waiting for the current cycle to finish");
    let _ = shutdown_tx.send(());
    let totals = scheduler_handle.await?;
    tracing::info!(
        recorded = totals.recorded,
        measurement_failures = totals.measurement_failures,
        persist_failures = totals.persist_failures,
        "stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
