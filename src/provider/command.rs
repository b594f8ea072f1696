// Measurement via an external speedtest client that prints a JSON report
// (speedtest-cli --json layout: bits/s for throughput, ms for ping).

use super::{MeasurementError, MeasurementProvider};
use crate::models::Measurement;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, instrument};

const BITS_PER_MEGABIT: f64 = 1_000_000.0;

#[derive(Debug, Deserialize)]
struct SpeedtestReport {
    download: f64,
    upload: f64,
    ping: f64,
    #[serde(default)]
    server: Option<SpeedtestServer>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeedtestServer {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    sponsor: Option<String>,
}

/// Parses a speedtest JSON report into a Measurement (throughput converted to Mbps).
pub fn parse_speedtest_json(output: &str) -> Result<Measurement, MeasurementError> {
    let report: SpeedtestReport =
        serde_json::from_str(output.trim()).map_err(|e| MeasurementError::Parse(e.to_string()))?;
    let server = report.server.unwrap_or_default();
    let measurement = Measurement {
        download_mbps: report.download / BITS_PER_MEGABIT,
        upload_mbps: report.upload / BITS_PER_MEGABIT,
        ping_ms: report.ping,
        server_name: non_blank(server.name),
        server_country: non_blank(server.country),
        server_sponsor: non_blank(server.sponsor),
    };
    if let Some((field, value)) = measurement.invalid_metric() {
        return Err(MeasurementError::InvalidValue { field, value });
    }
    Ok(measurement)
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Runs `program args...` once per measurement and parses its stdout.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl MeasurementProvider for CommandProvider {
    #[instrument(skip(self), fields(provider = "command", program = %self.program))]
    async fn measure(&self) -> Result<Measurement, MeasurementError> {
        debug!(command = %self.display(), "starting measurement");
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MeasurementError::Spawn {
                command: self.display(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MeasurementError::Exit {
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let m = parse_speedtest_json(&stdout)?;
        info!(
            server = m.server_name.as_deref().unwrap_or("unknown"),
            country = m.server_country.as_deref().unwrap_or("unknown"),
            download_mbps = m.download_mbps,
            upload_mbps = m.upload_mbps,
            ping_ms = m.ping_ms,
            "measurement complete"
        );
        Ok(m)
    }
}
