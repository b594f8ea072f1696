// Process-wide tracing setup, called once by each binary after config is loaded.

use crate::config::LoggingConfig;
use anyhow::Context;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` (e.g. "debug"); otherwise `default_level`.
pub fn filter_from_env(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            std::env::var("LOG_LEVEL")
                .map_err(|_| ())
                .and_then(|level| EnvFilter::try_new(level.to_lowercase()).map_err(|_| ()))
        })
        .unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Non-blocking writer over `<dir>/<prefix>.YYYY-MM-DD.log`, rotated daily, keeping `max_files`.
/// Log lines are flushed when the returned guard drops.
pub fn file_writer(
    dir: &Path,
    prefix: &str,
    max_files: usize,
) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_files)
        .build(dir)
        .with_context(|| format!("cannot open log file in {}", dir.display()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Stderr always; a rolling file as well when `logging.dir` is set. Keep the guard alive
/// until exit or buffered file lines are lost.
pub fn init(
    default_level: &str,
    prefix: &str,
    config: &LoggingConfig,
) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let (writer, guard) = file_writer(dir, prefix, config.max_files)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_from_env(default_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;
    Ok(guard)
}
