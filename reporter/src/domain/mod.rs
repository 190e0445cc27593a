//! Domain logic for metrics reporting
//!
//! - `snapshot` - Read-only metrics snapshot consumed by the reporter
//! - `tags` - Tag transformers applied to metric names
//! - `measurement` - Measurement mapping and package abbreviation
//! - `reporter` - Report cycle engine and periodic driver
//! - `runtime` - The reporter's own uptime and cycle metrics

pub mod error;
pub mod measurement;
pub mod reporter;
pub mod runtime;
pub mod snapshot;
pub mod tags;

pub use error::ConfigError;
pub use measurement::MeasurementMappings;
pub use reporter::{CycleOutcome, ReportOptions, Reporter, ReporterBuilder, ScheduledReporter};
pub use runtime::RuntimeMetrics;
pub use snapshot::{MetricFilter, MetricsSnapshot, MetricsSource};
pub use tags::{TagTransformer, Transformer};
