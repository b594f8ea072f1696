// Plain-text summary printed by the analysis binary.

use crate::models::{AggregatedStatistics, DataSufficiency, Metric, MetricSummary, TIMESTAMP_FORMAT};
use std::fmt::Write;

const RULE: &str = "============================================================";

pub fn render_summary(stats: &AggregatedStatistics) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_summary(&mut out, stats);
    out
}

fn write_summary(out: &mut String, stats: &AggregatedStatistics) -> std::fmt::Result {
    writeln!(out, "{RULE}")?;
    writeln!(out, "Statistics")?;
    writeln!(out, "{RULE}")?;
    writeln!(out)?;
    writeln!(out, "Records: {}", stats.record_count)?;
    if stats.dropped_rows > 0 {
        writeln!(out, "Dropped malformed rows: {}", stats.dropped_rows)?;
    }
    writeln!(
        out,
        "Time range: {} to {}",
        stats.first_timestamp.format(TIMESTAMP_FORMAT),
        stats.last_timestamp.format(TIMESTAMP_FORMAT)
    )?;

    for metric in Metric::ALL {
        writeln!(out)?;
        writeln!(out, "{} ({}):", metric.label(), metric.unit())?;
        write_metric(out, stats.summary(metric))?;
    }

    if !stats.server_usage.is_empty() {
        writeln!(out)?;
        writeln!(out, "Servers used:")?;
        for (server, count) in &stats.server_usage {
            writeln!(out, "  {server}: {count}")?;
        }
    }

    match &stats.servers {
        Some(groups) => {
            writeln!(out)?;
            writeln!(out, "{RULE}")?;
            writeln!(out, "Per-server statistics")?;
            writeln!(out, "{RULE}")?;
            writeln!(
                out,
                "{:<32} {:>6} {:>18} {:>18} {:>18}",
                "server", "count", "download mean/std", "upload mean/std", "ping mean/std"
            )?;
            for g in groups {
                writeln!(
                    out,
                    "{:<32} {:>6} {:>18} {:>18} {:>18}",
                    g.server,
                    g.count,
                    mean_std(&g.download),
                    mean_std(&g.upload),
                    mean_std(&g.ping)
                )?;
            }
        }
        None => {
            writeln!(out)?;
            writeln!(out, "Fewer than two servers seen; skipping per-server analysis")?;
        }
    }

    if let Some(advice) = sufficiency_advice(stats.sufficiency, stats.record_count) {
        writeln!(out)?;
        writeln!(out, "{advice}")?;
    }
    Ok(())
}

fn write_metric(out: &mut String, s: &MetricSummary) -> std::fmt::Result {
    writeln!(out, "  Mean: {:.2}", s.mean)?;
    writeln!(out, "  Median: {:.2}", s.median)?;
    writeln!(out, "  Max: {:.2}", s.max)?;
    writeln!(out, "  Min: {:.2}", s.min)?;
    writeln!(out, "  Std dev: {:.2}", s.std_dev)
}

fn mean_std(s: &MetricSummary) -> String {
    format!("{:.2}/{:.2}", s.mean, s.std_dev)
}

/// Advice shown when the dataset is too small for trends or full statistics.
pub fn sufficiency_advice(sufficiency: DataSufficiency, count: usize) -> Option<String> {
    match sufficiency {
        DataSufficiency::Minimal => Some(format!(
            "Note: only {count} record(s). Collect at least {} for a meaningful trend \
             and at least {} for a fuller statistical picture.",
            DataSufficiency::TREND_THRESHOLD,
            DataSufficiency::CONFIDENCE_THRESHOLD
        )),
        DataSufficiency::Limited => Some(format!(
            "Note: {count} records. Collect at least {} for a fuller statistical picture.",
            DataSufficiency::CONFIDENCE_THRESHOLD
        )),
        DataSufficiency::Sufficient => None,
    }
}
