//! The reporter's own runtime metrics

use std::sync::Arc;
use std::time::Instant;

use crate::domain::reporter::CycleCounters;
use crate::domain::snapshot::{MetricsSnapshot, MetricsSource};

/// Uptime gauge and report-cycle counters under a common prefix
pub struct RuntimeMetrics {
    prefix: String,
    started: Instant,
    counters: Arc<CycleCounters>,
}

impl RuntimeMetrics {
    pub fn new(prefix: impl Into<String>, counters: Arc<CycleCounters>) -> Self {
        Self {
            prefix: prefix.into(),
            started: Instant::now(),
            counters,
        }
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}.{}", self.prefix, suffix)
    }
}

impl MetricsSource for RuntimeMetrics {
    fn snapshot(&self) -> MetricsSnapshot {
        let saturating = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);

        MetricsSnapshot::default()
            .with_gauge(self.name("uptime_secs"), self.started.elapsed().as_secs_f64())
            .with_counter(self.name("cycles.sent"), saturating(self.counters.sent()))
            .with_counter(self.name("cycles.empty"), saturating(self.counters.empty()))
            .with_counter(self.name("cycles.failed"), saturating(self.counters.failed()))
            .with_counter(self.name("points.sent"), saturating(self.counters.points()))
    }
}
