// Domain models: provider output, persisted records, derived statistics

mod measurement;
mod record;
mod statistics;

pub use measurement::Measurement;
pub use record::{Dataset, MeasurementRecord, TIMESTAMP_FORMAT, UNKNOWN_SERVER};
pub use statistics::{
    AggregatedStatistics, DataSufficiency, Histogram, HistogramBin, Metric, MetricSummary,
    ServerGroup,
};
