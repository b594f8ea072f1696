// Derived statistics. Rebuilt from the full record set on every analysis run.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::MeasurementRecord;

/// The three measured quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Download,
    Upload,
    Ping,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Download, Metric::Upload, Metric::Ping];

    pub fn value(self, record: &MeasurementRecord) -> f64 {
        match self {
            Metric::Download => record.download_mbps,
            Metric::Upload => record.upload_mbps,
            Metric::Ping => record.ping_ms,
        }
    }

    /// Column name in the store.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Download => "download_mbps",
            Metric::Upload => "upload_mbps",
            Metric::Ping => "ping_ms",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Download => "Download",
            Metric::Upload => "Upload",
            Metric::Ping => "Ping",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Download | Metric::Upload => "Mbps",
            Metric::Ping => "ms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    /// Sample standard deviation (N-1). 0.0 for a single value.
    pub std_dev: f64,
}

/// How far the dataset supports trend and statistical reading. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSufficiency {
    /// Fewer than 3 records.
    Minimal,
    /// Fewer than 10 records.
    Limited,
    Sufficient,
}

impl DataSufficiency {
    pub const TREND_THRESHOLD: usize = 3;
    pub const CONFIDENCE_THRESHOLD: usize = 10;

    pub fn for_count(count: usize) -> Self {
        if count < Self::TREND_THRESHOLD {
            DataSufficiency::Minimal
        } else if count < Self::CONFIDENCE_THRESHOLD {
            DataSufficiency::Limited
        } else {
            DataSufficiency::Sufficient
        }
    }

    pub fn trend_meaningful(self) -> bool {
        self != DataSufficiency::Minimal
    }

    pub fn full_confidence(self) -> bool {
        self == DataSufficiency::Sufficient
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerGroup {
    pub server: String,
    pub count: usize,
    pub download: MetricSummary,
    pub upload: MetricSummary,
    pub ping: MetricSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub metric: Metric,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedStatistics {
    pub record_count: usize,
    pub dropped_rows: usize,
    pub first_timestamp: NaiveDateTime,
    pub last_timestamp: NaiveDateTime,
    pub download: MetricSummary,
    pub upload: MetricSummary,
    pub ping: MetricSummary,
    pub sufficiency: DataSufficiency,
    /// Records per named server, most used first.
    pub server_usage: Vec<(String, usize)>,
    /// Per-server breakdown; `None` when fewer than two servers were seen.
    pub servers: Option<Vec<ServerGroup>>,
    pub histogram_bins: usize,
    pub histograms: Vec<Histogram>,
}

impl AggregatedStatistics {
    pub fn summary(&self, metric: Metric) -> &MetricSummary {
        match metric {
            Metric::Download => &self.download,
            Metric::Upload => &self.upload,
            Metric::Ping => &self.ping,
        }
    }

    pub fn histogram(&self, metric: Metric) -> Option<&Histogram> {
        self.histograms.iter().find(|h| h.metric == metric)
    }
}

impl ServerGroup {
    pub fn summary(&self, metric: Metric) -> &MetricSummary {
        match metric {
            Metric::Download => &self.download,
            Metric::Upload => &self.upload,
            Metric::Ping => &self.ping,
        }
    }
}
