// Aggregation of the stored history: per-metric summaries, per-server breakdown,
// histograms and sufficiency advice. Always rebuilt from the full record set.

pub mod report;
pub mod stats;

use crate::models::{
    AggregatedStatistics, DataSufficiency, Dataset, Histogram, MeasurementRecord, Metric,
    ServerGroup,
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Upper bound on histogram bins regardless of dataset size.
pub const MAX_HISTOGRAM_BINS: usize = 20;

/// Server grouping needs at least this many distinct servers.
pub const MIN_SERVERS_FOR_GROUPING: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("no valid records to analyze ({dropped} rows dropped)")]
    EmptyDataset { dropped: usize },
}

/// `min(20, n)` clamped to at least one bin.
pub fn histogram_bin_count(record_count: usize) -> usize {
    record_count.clamp(1, MAX_HISTOGRAM_BINS)
}

pub fn analyze(dataset: &Dataset) -> Result<AggregatedStatistics, AnalysisError> {
    let records = &dataset.records;
    let empty = || AnalysisError::EmptyDataset {
        dropped: dataset.dropped_rows,
    };
    let (Some(first), Some(last)) = (
        records.iter().map(|r| r.timestamp).min(),
        records.iter().map(|r| r.timestamp).max(),
    ) else {
        return Err(empty());
    };

    let summary = |metric: Metric| {
        let values = column(records.iter(), metric);
        stats::summarize(&values).ok_or_else(empty)
    };
    let bins = histogram_bin_count(records.len());
    let histograms = Metric::ALL
        .iter()
        .map(|&metric| Histogram {
            metric,
            bins: stats::histogram(&column(records.iter(), metric), bins),
        })
        .collect();

    Ok(AggregatedStatistics {
        record_count: records.len(),
        dropped_rows: dataset.dropped_rows,
        first_timestamp: first,
        last_timestamp: last,
        download: summary(Metric::Download)?,
        upload: summary(Metric::Upload)?,
        ping: summary(Metric::Ping)?,
        sufficiency: DataSufficiency::for_count(records.len()),
        server_usage: server_usage(records),
        servers: group_by_server(records),
        histogram_bins: bins,
        histograms,
    })
}

fn column<'a>(records: impl Iterator<Item = &'a MeasurementRecord>, metric: Metric) -> Vec<f64> {
    records.map(|r| metric.value(r)).collect()
}

/// Records per named server, most used first; ties by name. Unnamed records are not counted.
fn server_usage(records: &[MeasurementRecord]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in records.iter().filter_map(|r| r.server_name.as_deref()) {
        *counts.entry(name).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// One group per distinct named server, ordered by name. `None` below two servers.
/// Records without a server name join no group and do not count as a server.
fn group_by_server(records: &[MeasurementRecord]) -> Option<Vec<ServerGroup>> {
    let mut by_server: BTreeMap<&str, Vec<&MeasurementRecord>> = BTreeMap::new();
    for r in records {
        if let Some(name) = r.server_name.as_deref() {
            by_server.entry(name).or_default().push(r);
        }
    }
    if by_server.len() < MIN_SERVERS_FOR_GROUPING {
        return None;
    }

    let groups = by_server
        .into_iter()
        .filter_map(|(server, refs)| {
            let summary = |metric| stats::summarize(&column(refs.iter().copied(), metric));
            Some(ServerGroup {
                server: server.to_string(),
                count: refs.len(),
                download: summary(Metric::Download)?,
                upload: summary(Metric::Upload)?,
                ping: summary(Metric::Ping)?,
            })
        })
        .collect();
    Some(groups)
}
