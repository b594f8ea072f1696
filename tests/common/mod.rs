// Shared test helpers
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use speedlog::models::{Measurement, MeasurementRecord};
use speedlog::provider::{MeasurementError, MeasurementProvider};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn measurement(download: f64, upload: f64, ping: f64, server: &str) -> Measurement {
    Measurement {
        download_mbps: download,
        upload_mbps: upload,
        ping_ms: ping,
        server_name: Some(server.to_string()),
        server_country: Some("Taiwan".to_string()),
        server_sponsor: None,
    }
}

pub fn record(timestamp: NaiveDateTime, download: f64, server: &str) -> MeasurementRecord {
    MeasurementRecord::from_measurement(timestamp, measurement(download, download / 2.0, 10.0, server))
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Replays scripted results in order, then fails every later call.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Measurement, String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Measurement, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MeasurementProvider for ScriptedProvider {
    async fn measure(&self) -> Result<Measurement, MeasurementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(m)) => Ok(m),
            Some(Err(cause)) => Err(MeasurementError::Parse(cause)),
            None => Err(MeasurementError::Parse("script exhausted".into())),
        }
    }
}
