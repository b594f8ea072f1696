// Measurement scheduler: one cycle immediately, then one per interval on a fixed grid.
// Cycles run serially in a single task; a failed measurement or a failed append only
// costs that cycle.

use crate::models::MeasurementRecord;
use crate::provider::MeasurementProvider;
use crate::result_store::ResultStore;
use std::sync::Arc;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tracing::instrument;

/// Provider, store, and shutdown for the scheduler.
pub struct SchedulerDeps<P> {
    pub provider: Arc<P>,
    pub store: ResultStore,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct SchedulerConfig {
    /// Period between cycle starts. Overrunning cycles do not shift later ticks.
    pub interval: Duration,
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Recorded(MeasurementRecord),
    MeasurementFailed,
    PersistFailed,
}

/// Running totals, logged after each cycle and on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTotals {
    pub recorded: u64,
    pub measurement_failures: u64,
    pub persist_failures: u64,
}

impl CycleTotals {
    fn count(&mut self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Recorded(_) => self.recorded += 1,
            CycleOutcome::MeasurementFailed => self.measurement_failures += 1,
            CycleOutcome::PersistFailed => self.persist_failures += 1,
        }
    }
}

/// Measures once and, on success, appends the stamped record. Never returns an error.
pub async fn run_cycle<P: MeasurementProvider>(provider: &P, store: &ResultStore) -> CycleOutcome {
    let measurement = match provider.measure().await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(
                error = %e,
                operation = "measure",
                "measurement failed; nothing recorded this cycle"
            );
            return CycleOutcome::MeasurementFailed;
        }
    };

    let record =
        MeasurementRecord::from_measurement(chrono::Local::now().naive_local(), measurement);
    if let Err(e) = store.append(&record).await {
        tracing::warn!(
            error = %e,
            operation = "append",
            timestamp = %record.timestamp,
            "failed to persist measurement; will try again next cycle"
        );
        return CycleOutcome::PersistFailed;
    }

    tracing::info!(
        timestamp = %record.timestamp,
        download_mbps = record.download_mbps,
        upload_mbps = record.upload_mbps,
        ping_ms = record.ping_ms,
        server = record.server_key(),
        "measurement recorded"
    );
    CycleOutcome::Recorded(record)
}

/// Spawns the scheduler task. It exits when `shutdown_rx` fires or its sender is dropped,
/// and returns the totals it accumulated.
pub fn spawn<P: MeasurementProvider>(
    deps: SchedulerDeps<P>,
    config: SchedulerConfig,
) -> tokio::task::JoinHandle<CycleTotals> {
    tokio::spawn(async move { run(deps, config.interval).await })
}

#[instrument(skip_all, fields(interval_secs = period.as_secs()))]
async fn run<P: MeasurementProvider>(deps: SchedulerDeps<P>, period: Duration) -> CycleTotals {
    let SchedulerDeps {
        provider,
        store,
        mut shutdown_rx,
    } = deps;

    // First tick completes immediately.
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut totals = CycleTotals::default();

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                tracing::debug!("Scheduler shutting down");
                break;
            }
            // The cycle runs inside the branch, so shutdown is only observed between cycles
            // and an append is never cut short.
            scheduled = tick.tick() => {
                let outcome = run_cycle(provider.as_ref(), &store).await;
                totals.count(&outcome);
                tracing::info!(
                    recorded = totals.recorded,
                    measurement_failures = totals.measurement_failures,
                    persist_failures = totals.persist_failures,
                    next_run = %next_run_at(scheduled, period).format("%Y-%m-%d %H:%M:%S"),
                    "cycle complete"
                );
            }
        }
    }

    tracing::info!(
        recorded = totals.recorded,
        measurement_failures = totals.measurement_failures,
        persist_failures = totals.persist_failures,
        "scheduler stopped"
    );
    totals
}

/// Wall-clock time of the next tick; "now" when the cycle overran its slot.
fn next_run_at(scheduled: Instant, period: Duration) -> chrono::DateTime<chrono::Local> {
    let wait = (scheduled + period).saturating_duration_since(Instant::now());
    chrono::Local::now() + chrono::Duration::from_std(wait).unwrap_or(chrono::Duration::zero())
}
