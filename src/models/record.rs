// Persisted measurement record and the validated set loaded from the store

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::Measurement;

/// Canonical on-disk timestamp format (local time, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Placeholder for an unknown descriptive field, both on disk and as a grouping key.
pub const UNKNOWN_SERVER: &str = "N/A";

/// One observation. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub timestamp: NaiveDateTime,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub server_name: Option<String>,
    pub server_country: Option<String>,
    pub server_sponsor: Option<String>,
}

impl MeasurementRecord {
    /// Builds a record from a provider result. Sub-second precision is dropped.
    pub fn from_measurement(timestamp: NaiveDateTime, m: Measurement) -> Self {
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            download_mbps: m.download_mbps,
            upload_mbps: m.upload_mbps,
            ping_ms: m.ping_ms,
            server_name: m.server_name,
            server_country: m.server_country,
            server_sponsor: m.server_sponsor,
        }
    }

    /// Identity used when grouping by server.
    pub fn server_key(&self) -> &str {
        self.server_name.as_deref().unwrap_or(UNKNOWN_SERVER)
    }
}

/// Records that survived validation, in store order, plus how many rows were rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<MeasurementRecord>,
    pub dropped_rows: usize,
}

impl Dataset {
    pub fn new(records: Vec<MeasurementRecord>, dropped_rows: usize) -> Self {
        Self {
            records,
            dropped_rows,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records stably sorted by timestamp ascending (chart input order).
    pub fn sorted_by_time(&self) -> Vec<MeasurementRecord> {
        let mut out = self.records.clone();
        out.sort_by_key(|r| r.timestamp);
        out
    }
}

impl From<Vec<MeasurementRecord>> for Dataset {
    fn from(records: Vec<MeasurementRecord>) -> Self {
        Self::new(records, 0)
    }
}
