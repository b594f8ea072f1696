use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the working directory when neither `--config` nor `CONFIG_FILE` is given.
pub const DEFAULT_CONFIG_FILE: &str = "speedlog.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub provider: ProviderConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("speedtest_results.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between cycle starts.
    pub interval_secs: u64,
    /// Optional deadline for a single measurement.
    pub measurement_timeout_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 20 * 60,
            measurement_timeout_secs: None,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn measurement_timeout(&self) -> Option<Duration> {
        self.measurement_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Program printing a speedtest JSON report on stdout.
    pub command: String,
    pub args: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            command: "speedtest-cli".into(),
            args: vec!["--json".into(), "--secure".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub charts_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            charts_dir: PathBuf::from("charts"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files; stderr only when unset.
    pub dir: Option<PathBuf>,
    /// Rotated files kept before the oldest is removed.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_files: 5,
        }
    }
}

impl AppConfig {
    /// Explicit path first, then `CONFIG_FILE`, then `speedlog.toml` if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CONFIG_FILE").map(PathBuf::from));
        match path {
            Some(path) => Self::load_file(&path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn load_file(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("config {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.store.path.as_os_str().is_empty(),
            "store.path must be non-empty"
        );
        anyhow::ensure!(
            self.scheduler.interval_secs > 0,
            "scheduler.interval_secs must be > 0, got {}",
            self.scheduler.interval_secs
        );
        if let Some(timeout) = self.scheduler.measurement_timeout_secs {
            anyhow::ensure!(
                timeout > 0,
                "scheduler.measurement_timeout_secs must be > 0, got {}",
                timeout
            );
        }
        anyhow::ensure!(
            !self.provider.command.trim().is_empty(),
            "provider.command must be non-empty"
        );
        anyhow::ensure!(
            !self.analysis.charts_dir.as_os_str().is_empty(),
            "analysis.charts_dir must be non-empty"
        );
        if let Some(dir) = &self.logging.dir {
            anyhow::ensure!(
                !dir.as_os_str().is_empty(),
                "logging.dir must be non-empty when set"
            );
        }
        anyhow::ensure!(
            self.logging.max_files > 0,
            "logging.max_files must be > 0, got {}",
            self.logging.max_files
        );
        Ok(())
    }
}
