// CSV row layout: fixed header order on write, header-name lookup on read.

use crate::models::{MeasurementRecord, TIMESTAMP_FORMAT, UNKNOWN_SERVER};
use chrono::NaiveDateTime;
use csv::StringRecord;
use thiserror::Error;

/// Column order of every store file. Never reorder; new columns go at the end and must be optional.
pub const HEADER: [&str; 7] = [
    "timestamp",
    "download_mbps",
    "upload_mbps",
    "ping_ms",
    "server_name",
    "server_country",
    "server_sponsor",
];

/// Timestamp layouts accepted on read, canonical first.
const READ_TIMESTAMP_FORMATS: [&str; 3] = [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Why a single row was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing value for {0}")]
    MissingField(&'static str),

    #[error("unparsable timestamp {0:?}")]
    Timestamp(String),

    #[error("invalid {field} value {value:?}")]
    Number { field: &'static str, value: String },
}

/// Header positions resolved once per load.
#[derive(Debug, Clone)]
pub(crate) struct Columns {
    timestamp: usize,
    download: usize,
    upload: usize,
    ping: usize,
    server_name: Option<usize>,
    server_country: Option<usize>,
    server_sponsor: Option<usize>,
}

impl Columns {
    /// Resolves columns by name. Returns the first missing required column on failure.
    pub(crate) fn resolve(headers: &StringRecord) -> Result<Self, &'static str> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &'static str| find(name).ok_or(name);
        Ok(Self {
            timestamp: required("timestamp")?,
            download: required("download_mbps")?,
            upload: required("upload_mbps")?,
            ping: required("ping_ms")?,
            server_name: find("server_name"),
            server_country: find("server_country"),
            server_sponsor: find("server_sponsor"),
        })
    }
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    READ_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Fields in `HEADER` order; numbers rounded to two decimals, unknown strings as `N/A`.
pub(crate) fn encode(record: &MeasurementRecord) -> [String; 7] {
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| UNKNOWN_SERVER.to_string());
    [
        format_timestamp(&record.timestamp),
        format!("{:.2}", record.download_mbps),
        format!("{:.2}", record.upload_mbps),
        format!("{:.2}", record.ping_ms),
        text(&record.server_name),
        text(&record.server_country),
        text(&record.server_sponsor),
    ]
}

pub(crate) fn decode(
    row: &StringRecord,
    columns: &Columns,
) -> Result<MeasurementRecord, ValidationError> {
    let raw_ts = row
        .get(columns.timestamp)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField("timestamp"))?;
    let timestamp =
        parse_timestamp(raw_ts).ok_or_else(|| ValidationError::Timestamp(raw_ts.to_string()))?;

    Ok(MeasurementRecord {
        timestamp,
        download_mbps: number(row, columns.download, "download_mbps")?,
        upload_mbps: number(row, columns.upload, "upload_mbps")?,
        ping_ms: number(row, columns.ping, "ping_ms")?,
        server_name: text(row, columns.server_name),
        server_country: text(row, columns.server_country),
        server_sponsor: text(row, columns.server_sponsor),
    })
}

fn number(row: &StringRecord, idx: usize, field: &'static str) -> Result<f64, ValidationError> {
    let raw = row
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField(field))?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ValidationError::Number {
            field,
            value: raw.to_string(),
        }),
    }
}

fn text(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    let value = row.get(idx?)?;
    if value == UNKNOWN_SERVER {
        None
    } else {
        Some(value.to_string())
    }
}
