use anyhow::{Context, Result};
use clap::Parser;
use speedlog::analysis::{self, report};
use speedlog::charts::{ChartRenderer, SvgChartRenderer};
use speedlog::config::AppConfig;
use speedlog::logging;
use speedlog::result_store::ResultStore;
use std::path::PathBuf;

/// Summarizes the recorded speed history and renders charts.
#[derive(Parser)]
#[command(name = "speedlog-analyze", version)]
struct Cli {
    /// TOML config file (falls back to CONFIG_FILE, then ./speedlog.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Result store path, overriding store.path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Chart output directory, overriding analysis.charts_dir
    #[arg(long)]
    charts_dir: Option<PathBuf>,

    /// Print statistics only
    #[arg(long)]
    no_charts: bool,

    /// Print statistics as JSON instead of the text summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app_config = AppConfig::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        app_config.store.path = store;
    }
    if let Some(dir) = cli.charts_dir {
        app_config.analysis.charts_dir = dir;
    }
    app_config.validate()?;
    let _log_guard = logging::init("warn", "speedlog-analyze", &app_config.logging)?;

    let store = ResultStore::new(app_config.store.path.clone());
    let dataset = store
        .load_all()
        .with_context(|| format!("cannot analyze {}", store.path().display()))?;
    let stats = analysis::analyze(&dataset)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Loaded {} records from {}", stats.record_count, store.path().display());
        println!();
        print!("{}", report::render_summary(&stats));
    }

    if !cli.no_charts {
        let records = dataset.sorted_by_time();
        let written = SvgChartRenderer.render(&records, &stats, &app_config.analysis.charts_dir)?;
        if !cli.json {
            println!();
            for path in &written {
                println!("Chart saved: {}", path.display());
            }
        }
    }
    Ok(())
}
