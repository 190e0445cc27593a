//! Periodic report driver

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{CycleOutcome, Reporter};
use crate::domain::snapshot::MetricsSource;

/// Running totals of cycle outcomes
#[derive(Debug, Default)]
pub struct CycleCounters {
    sent: AtomicU64,
    empty: AtomicU64,
    failed: AtomicU64,
    points: AtomicU64,
}

impl CycleCounters {
    pub fn record(&self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Sent { points, .. } => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                self.points.fetch_add(*points as u64, Ordering::Relaxed);
            }
            CycleOutcome::Empty => {
                self.empty.fetch_add(1, Ordering::Relaxed);
            }
            CycleOutcome::TransportError(_) | CycleOutcome::ConfigError(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn empty(&self) -> u64 {
        self.empty.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn points(&self) -> u64 {
        self.points.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.sent() + self.empty() + self.failed()
    }
}

/// Runs a [`Reporter`] on a fixed period until shutdown
pub struct ScheduledReporter {
    reporter: Reporter,
    source: Arc<dyn MetricsSource>,
    period: Duration,
    counters: Arc<CycleCounters>,
}

impl ScheduledReporter {
    pub fn new(reporter: Reporter, source: Arc<dyn MetricsSource>, period: Duration) -> Self {
        Self {
            reporter,
            source,
            period,
            counters: Arc::new(CycleCounters::default()),
        }
    }

    /// Record outcomes into externally owned counters
    pub fn with_counters(mut self, counters: Arc<CycleCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn counters(&self) -> Arc<CycleCounters> {
        Arc::clone(&self.counters)
    }

    /// Report one cycle now
    pub async fn run_once(&mut self) -> CycleOutcome {
        let outcome = self.reporter.report_from(self.source.as_ref()).await;
        self.counters.record(&outcome);
        outcome
    }

    /// Wait for background transport work of earlier cycles
    pub async fn drain(&mut self) {
        self.reporter.drain().await;
    }

    /// Spawn the periodic loop; a final report runs once shutdown is signalled
    pub fn start(mut self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(period_secs = self.period.as_secs_f64(), "Scheduled reporter started");

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::debug!("Scheduled reporter received shutdown, reporting final cycle");
                            self.run_once().await;
                            self.drain().await;
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                }
            }
            tracing::debug!(
                cycles = self.counters.total(),
                "Scheduled reporter shutdown complete"
            );
        })
    }
}
