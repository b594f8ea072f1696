// Measurement capability consumed by the scheduler.
// The real network test is an external collaborator; implementations only need to
// return a Measurement or a MeasurementError, never panic into the caller.

mod command;

pub use command::{CommandProvider, parse_speedtest_json};

use crate::models::Measurement;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("failed to start measurement command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("measurement command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("could not parse measurement output: {0}")]
    Parse(String),

    #[error("measurement reported invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("measurement did not finish within {0:?}")]
    TimedOut(Duration),
}

/// One throughput/latency measurement per call.
pub trait MeasurementProvider: Send + Sync + 'static {
    fn measure(&self) -> impl Future<Output = Result<Measurement, MeasurementError>> + Send;
}

/// Bounds any provider with a deadline; expiry surfaces as `MeasurementError::TimedOut`.
pub struct WithDeadline<P> {
    inner: P,
    deadline: Duration,
}

impl<P> WithDeadline<P> {
    pub fn new(inner: P, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

impl<P: MeasurementProvider> MeasurementProvider for WithDeadline<P> {
    async fn measure(&self) -> Result<Measurement, MeasurementError> {
        match tokio::time::timeout(self.deadline, self.inner.measure()).await {
            Ok(result) => result,
            Err(_) => Err(MeasurementError::TimedOut(self.deadline)),
        }
    }
}

/// Either a bare provider or one wrapped with a deadline, chosen from config at startup.
pub enum ConfiguredProvider<P> {
    Plain(P),
    Bounded(WithDeadline<P>),
}

impl<P> ConfiguredProvider<P> {
    pub fn new(inner: P, deadline: Option<Duration>) -> Self {
        match deadline {
            Some(d) => ConfiguredProvider::Bounded(WithDeadline::new(inner, d)),
            None => ConfiguredProvider::Plain(inner),
        }
    }
}

impl<P: MeasurementProvider> MeasurementProvider for ConfiguredProvider<P> {
    async fn measure(&self) -> Result<Measurement, MeasurementError> {
        match self {
            ConfiguredProvider::Plain(p) => p.measure().await,
            ConfiguredProvider::Bounded(p) => p.measure().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    impl MeasurementProvider for Slow {
        async fn measure(&self) -> Result<Measurement, MeasurementError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Measurement {
                download_mbps: 1.0,
                upload_mbps: 1.0,
                ping_ms: 1.0,
                server_name: None,
                server_country: None,
                server_sponsor: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_maps_expiry_to_timed_out() {
        let provider = WithDeadline::new(Slow, Duration::from_secs(90));
        let err = provider.measure().await.unwrap_err();
        assert!(matches!(err, MeasurementError::TimedOut(d) if d == Duration::from_secs(90)));
    }

    #[tokio::test(start_paused = true)]
    async fn configured_without_deadline_waits_for_inner() {
        let provider = ConfiguredProvider::new(Slow, None);
        let m = provider.measure().await.unwrap();
        assert_eq!(m.download_mbps, 1.0);
    }
}
