//! Read-only view of a metrics registry at one instant

use std::collections::{BTreeMap, BTreeSet};

use crate::data::point::FieldValue;

/// Summary statistics of a sampled distribution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub stddev: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
    pub p999: f64,
}

/// Exponentially weighted and mean rates, in events per second
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rates {
    pub m1: f64,
    pub m5: f64,
    pub m15: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSnapshot {
    pub count: i64,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rates: Rates,
}

/// Timer values; the distribution is expressed in nanoseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerSnapshot {
    pub count: i64,
    pub distribution: Distribution,
    pub rates: Rates,
}

/// Every metric of a registry, each kind ordered by name
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub gauges: BTreeMap<String, FieldValue>,
    pub counters: BTreeMap<String, CounterSnapshot>,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
    pub meters: BTreeMap<String, MeterSnapshot>,
    pub timers: BTreeMap<String, TimerSnapshot>,
}

impl MetricsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
            && self.counters.is_empty()
            && self.histograms.is_empty()
            && self.meters.is_empty()
            && self.timers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    pub fn with_gauge(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.gauges.insert(name.into(), value.into());
        self
    }

    pub fn with_counter(mut self, name: impl Into<String>, count: i64) -> Self {
        self.counters.insert(name.into(), CounterSnapshot { count });
        self
    }

    pub fn with_histogram(mut self, name: impl Into<String>, histogram: HistogramSnapshot) -> Self {
        self.histograms.insert(name.into(), histogram);
        self
    }

    pub fn with_meter(mut self, name: impl Into<String>, meter: MeterSnapshot) -> Self {
        self.meters.insert(name.into(), meter);
        self
    }

    pub fn with_timer(mut self, name: impl Into<String>, timer: TimerSnapshot) -> Self {
        self.timers.insert(name.into(), timer);
        self
    }
}

/// Anything that can hand out a snapshot of its metrics
pub trait MetricsSource: Send + Sync {
    fn snapshot(&self) -> MetricsSnapshot;
}

/// Include/exclude filter on metric names.
///
/// An empty include set admits every name; excludes always win.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    includes: BTreeSet<String>,
    excludes: BTreeSet<String>,
}

impl MetricFilter {
    pub fn new(
        includes: impl IntoIterator<Item = String>,
        excludes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            includes: includes.into_iter().collect(),
            excludes: excludes.into_iter().collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        (self.includes.is_empty() || self.includes.contains(name)) && !self.excludes.contains(name)
    }
}
