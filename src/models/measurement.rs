// Result of one successful provider run

use serde::{Deserialize, Serialize};

/// Throughput and latency reported by a single measurement, plus the
/// identity of the server it ran against (when the provider knows it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub server_country: Option<String>,
    #[serde(default)]
    pub server_sponsor: Option<String>,
}

impl Measurement {
    /// Returns the first metric that is negative or not finite, with its value.
    pub fn invalid_metric(&self) -> Option<(&'static str, f64)> {
        [
            ("download_mbps", self.download_mbps),
            ("upload_mbps", self.upload_mbps),
            ("ping_ms", self.ping_ms),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    }
}
