//! Reporter engine
//!
//! Converts a [`MetricsSnapshot`] into points on the sender's batch and ships
//! them. A report cycle never fails: transport and configuration problems are
//! logged, the cycle's data is dropped, and the outcome is returned for
//! bookkeeping.

mod fields;
mod idle;
mod schedule;

pub use idle::IdleTracker;
pub use schedule::{CycleCounters, ScheduledReporter};

use std::collections::BTreeSet;

use crate::data::point::{FieldValue, Fields, Point, Tags};
use crate::data::senders::{InfluxSender, SendError};
use crate::domain::error::ConfigError;
use crate::domain::measurement::{MeasurementMappings, abbreviate_package};
use crate::domain::snapshot::{MetricFilter, MetricsSnapshot, MetricsSource};
use crate::domain::tags::TagTransformer;
use crate::utils::time::{TimeUnit, now_millis};

use fields::{
    FIELD_COUNT, FIELD_VALUE, group_by_last_dot, histogram_fields, meter_fields, retain_included,
    timer_fields,
};

/// Result of one report cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to send
    Empty,
    /// Batch delivered to the transport
    Sent { points: usize, status: u16 },
    /// Transport failed; the batch was dropped
    TransportError(String),
    /// Sender misconfigured; the batch was dropped
    ConfigError(String),
}

/// Per-reporter policy knobs
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub rate_unit: TimeUnit,
    pub duration_unit: TimeUnit,
    pub skip_idle_metrics: bool,
    pub skip_idle_counters: bool,
    pub group_gauges: bool,
    pub group_counters: bool,
    pub include_timer_fields: Option<BTreeSet<String>>,
    pub include_meter_fields: Option<BTreeSet<String>>,
    pub abbreviate_packages: bool,
    pub filter: MetricFilter,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            skip_idle_metrics: false,
            skip_idle_counters: true,
            group_gauges: false,
            group_counters: false,
            include_timer_fields: None,
            include_meter_fields: None,
            abbreviate_packages: false,
            filter: MetricFilter::default(),
        }
    }
}

pub struct Reporter {
    sender: InfluxSender,
    options: ReportOptions,
    mappings: MeasurementMappings,
    transformer: TagTransformer,
    idle: IdleTracker,
}

impl Reporter {
    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::default()
    }

    pub fn sender(&self) -> &InfluxSender {
        &self.sender
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Wait for sends the transport finishes in the background
    pub async fn drain(&mut self) {
        self.sender.drain().await;
    }

    /// Pull a snapshot from `source` and report it
    pub async fn report_from(&mut self, source: &dyn MetricsSource) -> CycleOutcome {
        let snapshot = source.snapshot();
        self.report(&snapshot).await
    }

    /// Run one report cycle
    pub async fn report(&mut self, snapshot: &MetricsSnapshot) -> CycleOutcome {
        let now = now_millis();
        self.sender.flush();
        self.collect(snapshot, now);

        if !self.sender.has_series_data() {
            tracing::trace!("No series data to report");
            return CycleOutcome::Empty;
        }

        let points = self.sender.batch().len();
        match self.sender.write_data().await {
            Ok(status) => {
                tracing::debug!(
                    points,
                    status,
                    transport = self.sender.transport_name(),
                    "Reported metrics"
                );
                CycleOutcome::Sent { points, status }
            }
            Err(e) if e.is_connect() => {
                tracing::info!(error = %e, points, "Unable to connect to InfluxDB. Discarding data.");
                CycleOutcome::TransportError(e.to_string())
            }
            Err(SendError::Config(msg)) => {
                tracing::warn!(error = %msg, points, "Unable to report to InfluxDB. Discarding data.");
                CycleOutcome::ConfigError(msg)
            }
            Err(e) => {
                tracing::warn!(error = %e, points, "Unable to report to InfluxDB. Discarding data.");
                CycleOutcome::TransportError(e.to_string())
            }
        }
    }

    /// Build points for every metric into the sender's batch
    fn collect(&mut self, snapshot: &MetricsSnapshot, now: i64) {
        self.collect_gauges(snapshot, now);
        self.collect_counters(snapshot, now);

        for (name, histogram) in &snapshot.histograms {
            if !self.options.filter.matches(name) || self.can_skip(name, histogram.count) {
                continue;
            }
            self.append(name, histogram_fields(histogram), now);
        }

        for (name, meter) in &snapshot.meters {
            if !self.options.filter.matches(name) || self.can_skip(name, meter.count) {
                continue;
            }
            let mut fields = meter_fields(meter, self.options.rate_unit);
            retain_included(&mut fields, self.options.include_meter_fields.as_ref());
            self.append(name, fields, now);
        }

        for (name, timer) in &snapshot.timers {
            if !self.options.filter.matches(name) || self.can_skip(name, timer.count) {
                continue;
            }
            let mut fields = timer_fields(timer, self.options.duration_unit, self.options.rate_unit);
            retain_included(&mut fields, self.options.include_timer_fields.as_ref());
            self.append(name, fields, now);
        }
    }

    fn collect_gauges(&mut self, snapshot: &MetricsSnapshot, now: i64) {
        let gauges = snapshot
            .gauges
            .iter()
            .filter(|(name, _)| self.options.filter.matches(name))
            .map(|(name, value)| (name.as_str(), value.clone()));

        if self.options.group_gauges {
            for (name, fields) in group_by_last_dot(gauges) {
                self.append(&name, fields, now);
            }
            return;
        }

        let ungrouped: Vec<(&str, FieldValue)> = gauges
            .filter_map(|(name, value)| value.sanitized().map(|v| (name, v)))
            .collect();
        for (name, value) in ungrouped {
            self.append(name, Fields::from([(FIELD_VALUE.to_string(), value)]), now);
        }
    }

    fn collect_counters(&mut self, snapshot: &MetricsSnapshot, now: i64) {
        let counters = snapshot
            .counters
            .iter()
            .filter(|(name, _)| self.options.filter.matches(name));

        if self.options.group_counters {
            let entries: Vec<(&str, FieldValue)> = counters
                .map(|(name, counter)| (name.as_str(), FieldValue::Integer(counter.count)))
                .collect();
            for (name, fields) in group_by_last_dot(entries) {
                self.append(&name, fields, now);
            }
            return;
        }

        let counters: Vec<(&String, i64)> = counters.map(|(n, c)| (n, c.count)).collect();
        for (name, count) in counters {
            if self.options.skip_idle_counters && self.can_skip(name, count) {
                continue;
            }
            self.append(name, Fields::from([(FIELD_COUNT.to_string(), count.into())]), now);
        }
    }

    fn can_skip(&mut self, name: &str, count: i64) -> bool {
        self.options.skip_idle_metrics && self.idle.is_idle(name, count)
    }

    fn append(&mut self, name: &str, fields: Fields, now: i64) {
        if fields.is_empty() {
            return;
        }
        let measurement = self.measurement_name(name);
        let tags = self.tags_for(name);
        self.sender
            .append_point(Point::new(measurement, fields).with_tags(tags).with_timestamp(now));
    }

    fn measurement_name(&self, name: &str) -> String {
        match self.mappings.resolve(name) {
            Some(measurement) => measurement.to_string(),
            None if self.options.abbreviate_packages => abbreviate_package(name),
            None => name.to_string(),
        }
    }

    fn tags_for(&self, name: &str) -> Tags {
        let mut tags = self.sender.tags().clone();
        tags.extend(self.transformer.tags(name));
        tags
    }
}

/// Assembles a [`Reporter`] around a sender
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    tags: Tags,
    options: ReportOptions,
    mappings: Vec<(String, String)>,
    transformer: TagTransformer,
}

impl ReporterBuilder {
    /// Tags added to every point
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn convert_rates_to(mut self, unit: TimeUnit) -> Self {
        self.options.rate_unit = unit;
        self
    }

    pub fn convert_durations_to(mut self, unit: TimeUnit) -> Self {
        self.options.duration_unit = unit;
        self
    }

    pub fn filter(mut self, filter: MetricFilter) -> Self {
        self.options.filter = filter;
        self
    }

    pub fn skip_idle_metrics(mut self, skip: bool) -> Self {
        self.options.skip_idle_metrics = skip;
        self
    }

    pub fn skip_idle_counters(mut self, skip: bool) -> Self {
        self.options.skip_idle_counters = skip;
        self
    }

    pub fn group_gauges(mut self, group: bool) -> Self {
        self.options.group_gauges = group;
        self
    }

    pub fn group_counters(mut self, group: bool) -> Self {
        self.options.group_counters = group;
        self
    }

    pub fn include_timer_fields(mut self, fields: BTreeSet<String>) -> Self {
        self.options.include_timer_fields = Some(fields);
        self
    }

    pub fn include_meter_fields(mut self, fields: BTreeSet<String>) -> Self {
        self.options.include_meter_fields = Some(fields);
        self
    }

    pub fn abbreviate_packages(mut self, abbreviate: bool) -> Self {
        self.options.abbreviate_packages = abbreviate;
        self
    }

    /// Ordered `(measurement, pattern)` pairs; compiled by [`build`](Self::build)
    pub fn measurement_mappings(mut self, mappings: Vec<(String, String)>) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn tags_transformer(mut self, transformer: TagTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn build(self, mut sender: InfluxSender) -> Result<Reporter, ConfigError> {
        let mappings = MeasurementMappings::compile(self.mappings.iter().map(|(n, p)| (n, p)))?;
        sender.set_tags(self.tags);

        tracing::debug!(
            mappings = mappings.len(),
            transformer = self.transformer.name(),
            skip_idle = self.options.skip_idle_metrics,
            group_gauges = self.options.group_gauges,
            group_counters = self.options.group_counters,
            "Reporter built"
        );

        Ok(Reporter {
            sender,
            options: self.options,
            mappings,
            transformer: self.transformer,
            idle: IdleTracker::new(),
        })
    }
}
