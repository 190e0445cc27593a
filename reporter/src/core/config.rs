use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_EXCLUDES, DEFAULT_HOST,
    DEFAULT_MEASUREMENT_MAPPINGS, DEFAULT_METER_FIELDS, DEFAULT_PERIOD_SECS, DEFAULT_PORT,
    DEFAULT_PROTOCOL, DEFAULT_READ_TIMEOUT_MS, DEFAULT_TIMER_FIELDS,
};
use crate::data::point::Tags;
use crate::domain::error::ConfigError;
use crate::domain::measurement::{MeasurementMappings, merge_mappings};
use crate::domain::reporter::{ReportOptions, ReporterBuilder};
use crate::domain::snapshot::MetricFilter;
use crate::domain::tags::{Category, PositionBasedTransformer, TagTransformer};
use crate::utils::time::TimeUnit;

// =============================================================================
// Sender Kind Enum
// =============================================================================

/// Transport used to ship line protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    #[default]
    Http,
    Tcp,
    Udp,
    Logger,
    #[serde(alias = "kafka")]
    PubSub,
}

impl SenderKind {
    /// Whether the sender talks to `host:port` directly
    pub fn uses_endpoint(&self) -> bool {
        matches!(self, SenderKind::Http | SenderKind::Tcp | SenderKind::Udp)
    }
}

impl fmt::Display for SenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderKind::Http => write!(f, "http"),
            SenderKind::Tcp => write!(f, "tcp"),
            SenderKind::Udp => write!(f, "udp"),
            SenderKind::Logger => write!(f, "logger"),
            SenderKind::PubSub => write!(f, "pubsub"),
        }
    }
}

// =============================================================================
// Tag Transformer Config
// =============================================================================

/// One position-based category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryConfig {
    pub position: i64,
    #[serde(alias = "mapping")]
    pub pattern: String,
}

/// Tag transformer selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformerConfig {
    #[default]
    Noop,
    ClassBased,
    PositionBased {
        #[serde(default)]
        categories: BTreeMap<String, CategoryConfig>,
    },
}

impl TransformerConfig {
    pub fn build(&self) -> Result<TagTransformer, ConfigError> {
        match self {
            TransformerConfig::Noop => Ok(TagTransformer::Noop),
            TransformerConfig::ClassBased => Ok(TagTransformer::ClassBased),
            TransformerConfig::PositionBased { categories } => {
                let categories = categories
                    .iter()
                    .map(|(name, c)| {
                        Category::new(name, c.position, &c.pattern).map(|cat| (name.clone(), cat))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TagTransformer::PositionBased(PositionBasedTransformer::new(
                    categories,
                )))
            }
        }
    }
}

// =============================================================================
// File Config (JSON)
// =============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SenderFileConfig {
    #[serde(rename = "type")]
    pub kind: Option<SenderKind>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub auth: Option<String>,
    pub precision: Option<TimeUnit>,
    pub prefix: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub trust_all_certs: Option<bool>,
    pub trust_all_hostnames: Option<bool>,
    pub group_measurement: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FieldsFileConfig {
    pub timers: Option<BTreeSet<String>>,
    pub meters: Option<BTreeSet<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReporterFileConfig {
    pub period_secs: Option<u64>,
    pub tags: Option<BTreeMap<String, String>>,
    pub fields: Option<FieldsFileConfig>,
    pub rate_unit: Option<TimeUnit>,
    pub duration_unit: Option<TimeUnit>,
    pub group_gauges: Option<bool>,
    pub group_counters: Option<bool>,
    pub skip_idle_metrics: Option<bool>,
    pub skip_idle_counters: Option<bool>,
    pub abbreviate_packages: Option<bool>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub measurement_mappings: Option<Vec<(String, String)>>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub default_measurement_mappings: Option<Vec<(String, String)>>,
    pub includes: Option<BTreeSet<String>>,
    pub excludes: Option<BTreeSet<String>>,
    pub transformer: Option<TransformerConfig>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub sender: Option<SenderFileConfig>,
    pub reporter: Option<ReporterFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Copy every `Some` field of `$other` over `$current`
macro_rules! merge_fields {
    ($section:literal, $current:expr, $other:expr; $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                tracing::trace!(field = concat!($section, ".", stringify!($field)), "Merging config field");
                $current.$field = $other.$field;
            }
        )+
    };
}

impl FileConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Top-level keys that no section claimed
    pub fn unknown_fields(&self) -> Vec<&str> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().map(|k| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        let keys = self.unknown_fields();
        if !keys.is_empty() {
            tracing::warn!(
                fields = %keys.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    pub fn merge(&mut self, other: FileConfig) {
        if let Some(sender) = other.sender {
            let current = self.sender.get_or_insert_with(SenderFileConfig::default);
            merge_fields!("sender", current, sender;
                kind, protocol, host, port, database, auth, precision, prefix,
                connect_timeout_ms, read_timeout_ms, trust_all_certs, trust_all_hostnames,
                group_measurement,
            );
        }

        if let Some(reporter) = other.reporter {
            let current = self.reporter.get_or_insert_with(ReporterFileConfig::default);
            if let Some(fields) = reporter.fields {
                let current_fields = current.fields.get_or_insert_with(FieldsFileConfig::default);
                merge_fields!("reporter.fields", current_fields, fields; timers, meters);
            }
            merge_fields!("reporter", current, reporter;
                period_secs, tags, rate_unit, duration_unit, group_gauges, group_counters,
                skip_idle_metrics, skip_idle_counters, abbreviate_packages, measurement_mappings,
                default_measurement_mappings, includes, excludes, transformer,
            );
        }
    }
}

/// Deserialize a JSON object into `(key, value)` pairs in document order
fn ordered_pairs<'de, D>(deserializer: D) -> Result<Option<Vec<(String, String)>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of measurement name to pattern")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::new();
            while let Some(entry) = map.next_entry::<String, String>()? {
                pairs.push(entry);
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairsVisitor).map(Some)
}

// =============================================================================
// Resolved Config
// =============================================================================

/// Everything needed to build a sender
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub kind: SenderKind,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// `user:password`, empty for no authentication
    pub auth: String,
    pub precision: TimeUnit,
    pub prefix: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub trust_all_certs: bool,
    pub trust_all_hostnames: bool,
    pub group_measurement: Option<String>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            kind: SenderKind::default(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: String::new(),
            auth: String::new(),
            precision: TimeUnit::Minutes,
            prefix: String::new(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            trust_all_certs: false,
            trust_all_hostnames: false,
            group_measurement: None,
        }
    }
}

/// Reporter policy plus scheduling
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub period: Duration,
    pub tags: Tags,
    pub timer_fields: BTreeSet<String>,
    pub meter_fields: BTreeSet<String>,
    pub rate_unit: TimeUnit,
    pub duration_unit: TimeUnit,
    pub group_gauges: bool,
    pub group_counters: bool,
    pub skip_idle_metrics: bool,
    pub skip_idle_counters: bool,
    pub abbreviate_packages: bool,
    /// Default table with overrides applied, in match order
    pub measurement_mappings: Vec<(String, String)>,
    pub includes: BTreeSet<String>,
    pub excludes: BTreeSet<String>,
    pub transformer: TransformerConfig,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            tags: Tags::new(),
            timer_fields: to_set(DEFAULT_TIMER_FIELDS),
            meter_fields: to_set(DEFAULT_METER_FIELDS),
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            group_gauges: true,
            group_counters: false,
            skip_idle_metrics: false,
            skip_idle_counters: true,
            abbreviate_packages: false,
            measurement_mappings: default_mapping_pairs(),
            includes: BTreeSet::new(),
            excludes: to_set(DEFAULT_EXCLUDES),
            transformer: TransformerConfig::Noop,
        }
    }
}

impl ReporterConfig {
    pub fn options(&self) -> ReportOptions {
        ReportOptions {
            rate_unit: self.rate_unit,
            duration_unit: self.duration_unit,
            skip_idle_metrics: self.skip_idle_metrics,
            skip_idle_counters: self.skip_idle_counters,
            group_gauges: self.group_gauges,
            group_counters: self.group_counters,
            include_timer_fields: Some(self.timer_fields.clone()),
            include_meter_fields: Some(self.meter_fields.clone()),
            abbreviate_packages: self.abbreviate_packages,
            filter: MetricFilter::new(self.includes.clone(), self.excludes.clone()),
        }
    }

    /// Reporter builder carrying this configuration
    pub fn builder(&self) -> Result<ReporterBuilder, ConfigError> {
        Ok(ReporterBuilder::default()
            .with_tags(self.tags.clone())
            .options(self.options())
            .measurement_mappings(self.measurement_mappings.clone())
            .tags_transformer(self.transformer.build()?))
    }
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub sender: SenderConfig,
    pub reporter: ReporterConfig,
}

impl AppConfig {
    /// Load configuration: defaults -> local config file -> `--config` file -> CLI/env
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            let local_config = FileConfig::load_from_file(&local)?;
            local_config.warn_unknown_fields();
            file_config.merge(local_config);
            found_configs.push(local.display().to_string());
        }

        if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            let overlay_config = FileConfig::load_from_file(path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");
        Self::from_file_config(file_config, cli)
    }

    /// Layer a parsed file config and CLI overrides over the defaults, then validate
    pub fn from_file_config(file_config: FileConfig, cli: &CliConfig) -> Result<Self> {
        let file_sender = file_config.sender.unwrap_or_default();
        let file_reporter = file_config.reporter.unwrap_or_default();
        let file_fields = file_reporter.fields.unwrap_or_default();
        let sender_defaults = SenderConfig::default();
        let reporter_defaults = ReporterConfig::default();

        let sender = SenderConfig {
            kind: cli.sender.or(file_sender.kind).unwrap_or(sender_defaults.kind),
            protocol: file_sender.protocol.unwrap_or(sender_defaults.protocol),
            host: cli
                .host
                .clone()
                .or(file_sender.host)
                .unwrap_or(sender_defaults.host),
            port: cli.port.or(file_sender.port).unwrap_or(sender_defaults.port),
            database: cli
                .database
                .clone()
                .or(file_sender.database)
                .unwrap_or(sender_defaults.database),
            auth: file_sender.auth.unwrap_or(sender_defaults.auth),
            precision: file_sender.precision.unwrap_or(sender_defaults.precision),
            prefix: file_sender.prefix.unwrap_or(sender_defaults.prefix),
            connect_timeout: file_sender
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(sender_defaults.connect_timeout),
            read_timeout: file_sender
                .read_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(sender_defaults.read_timeout),
            trust_all_certs: file_sender
                .trust_all_certs
                .unwrap_or(sender_defaults.trust_all_certs),
            trust_all_hostnames: file_sender
                .trust_all_hostnames
                .unwrap_or(sender_defaults.trust_all_hostnames),
            group_measurement: file_sender.group_measurement,
        };

        let base_mappings = file_reporter
            .default_measurement_mappings
            .unwrap_or(reporter_defaults.measurement_mappings);
        let measurement_mappings = merge_mappings(
            &base_mappings,
            &file_reporter.measurement_mappings.unwrap_or_default(),
        );

        let reporter = ReporterConfig {
            period: cli
                .period_secs
                .or(file_reporter.period_secs)
                .map(Duration::from_secs)
                .unwrap_or(reporter_defaults.period),
            tags: file_reporter.tags.unwrap_or(reporter_defaults.tags),
            timer_fields: file_fields.timers.unwrap_or(reporter_defaults.timer_fields),
            meter_fields: file_fields.meters.unwrap_or(reporter_defaults.meter_fields),
            rate_unit: file_reporter.rate_unit.unwrap_or(reporter_defaults.rate_unit),
            duration_unit: file_reporter
                .duration_unit
                .unwrap_or(reporter_defaults.duration_unit),
            group_gauges: file_reporter
                .group_gauges
                .unwrap_or(reporter_defaults.group_gauges),
            group_counters: file_reporter
                .group_counters
                .unwrap_or(reporter_defaults.group_counters),
            skip_idle_metrics: file_reporter
                .skip_idle_metrics
                .unwrap_or(reporter_defaults.skip_idle_metrics),
            skip_idle_counters: file_reporter
                .skip_idle_counters
                .unwrap_or(reporter_defaults.skip_idle_counters),
            abbreviate_packages: file_reporter
                .abbreviate_packages
                .unwrap_or(reporter_defaults.abbreviate_packages),
            measurement_mappings,
            includes: file_reporter.includes.unwrap_or_default(),
            excludes: file_reporter
                .excludes
                .unwrap_or(reporter_defaults.excludes),
            transformer: file_reporter
                .transformer
                .unwrap_or(reporter_defaults.transformer),
        };

        let config = Self { sender, reporter };
        config.validate()?;

        tracing::debug!(
            sender = %config.sender.kind,
            host = %config.sender.host,
            port = config.sender.port,
            database = %config.sender.database,
            period_secs = config.reporter.period.as_secs(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let sender = &self.sender;

        if sender.kind.uses_endpoint() && sender.host.is_empty() {
            anyhow::bail!("Configuration error: sender.host must not be empty");
        }
        if sender.kind.uses_endpoint() && sender.port == 0 {
            anyhow::bail!("Configuration error: sender.port must be greater than 0");
        }
        if sender.connect_timeout.is_zero() || sender.read_timeout.is_zero() {
            anyhow::bail!("Configuration error: sender timeouts must be greater than 0");
        }
        if sender.kind == SenderKind::PubSub && !sender.database.contains('@') {
            anyhow::bail!(
                "Configuration error: sender.database '{}' must have the form topic@host1,host2 for the pubsub sender",
                sender.database
            );
        }
        if sender
            .group_measurement
            .as_ref()
            .is_some_and(|g| g.is_empty())
        {
            anyhow::bail!("Configuration error: sender.group_measurement must not be empty");
        }

        if self.reporter.period.is_zero() {
            anyhow::bail!("Configuration error: reporter.period_secs must be greater than 0");
        }

        MeasurementMappings::compile(
            self.reporter
                .measurement_mappings
                .iter()
                .map(|(n, p)| (n, p)),
        )
        .context("Configuration error: reporter.measurement_mappings")?;

        self.reporter
            .transformer
            .build()
            .context("Configuration error: reporter.transformer")?;

        Ok(())
    }
}

fn to_set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_mapping_pairs() -> Vec<(String, String)> {
    DEFAULT_MEASUREMENT_MAPPINGS
        .iter()
        .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_sender_kind_serde() {
        let kind: SenderKind = serde_json::from_str(r#""udp""#).unwrap();
        assert_eq!(kind, SenderKind::Udp);
        let kind: SenderKind = serde_json::from_str(r#""kafka""#).unwrap();
        assert_eq!(kind, SenderKind::PubSub);
        assert_eq!(SenderKind::Logger.to_string(), "logger");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_file_config(FileConfig::default(), &CliConfig::default())
            .unwrap();
        assert_eq!(config.sender.kind, SenderKind::Http);
        assert_eq!(config.sender.protocol, "http");
        assert_eq!(config.sender.host, "localhost");
        assert_eq!(config.sender.port, 8086);
        assert_eq!(config.sender.precision, TimeUnit::Minutes);
        assert_eq!(config.sender.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.sender.read_timeout, Duration::from_millis(1500));
        assert!(config.sender.auth.is_empty());

        assert_eq!(config.reporter.period, Duration::from_secs(60));
        assert!(config.reporter.group_gauges);
        assert!(!config.reporter.group_counters);
        assert!(!config.reporter.skip_idle_metrics);
        assert_eq!(config.reporter.timer_fields, to_set(&["p50", "p99", "m1_rate"]));
        assert_eq!(config.reporter.meter_fields, to_set(&["m1_rate"]));
        assert_eq!(config.reporter.measurement_mappings.len(), 12);
        assert_eq!(config.reporter.measurement_mappings[0].0, "health");
        assert_eq!(config.reporter.measurement_mappings[11].0, "raw_sql");
    }

    #[test]
    fn test_file_config_parse_full() {
        let file = parse(
            r#"{
                "sender": {
                    "type": "tcp",
                    "host": "influx.internal",
                    "port": 8094,
                    "database": "metrics",
                    "precision": "s",
                    "prefix": "app.",
                    "read_timeout_ms": 500,
                    "group_measurement": "all"
                },
                "reporter": {
                    "period_secs": 10,
                    "tags": { "env": "prod" },
                    "fields": { "timers": ["p99"] },
                    "group_counters": true,
                    "skip_idle_metrics": true,
                    "includes": ["a", "b"],
                    "transformer": { "type": "class_based" }
                }
            }"#,
        );
        let config = AppConfig::from_file_config(file, &CliConfig::default()).unwrap();

        assert_eq!(config.sender.kind, SenderKind::Tcp);
        assert_eq!(config.sender.host, "influx.internal");
        assert_eq!(config.sender.port, 8094);
        assert_eq!(config.sender.precision, TimeUnit::Seconds);
        assert_eq!(config.sender.prefix, "app.");
        assert_eq!(config.sender.read_timeout, Duration::from_millis(500));
        assert_eq!(config.sender.group_measurement.as_deref(), Some("all"));

        assert_eq!(config.reporter.period, Duration::from_secs(10));
        assert_eq!(config.reporter.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(config.reporter.timer_fields, to_set(&["p99"]));
        assert_eq!(config.reporter.meter_fields, to_set(&["m1_rate"]));
        assert!(config.reporter.group_counters);
        assert!(config.reporter.skip_idle_metrics);
        assert_eq!(config.reporter.includes, to_set(&["a", "b"]));
        assert_eq!(config.reporter.transformer, TransformerConfig::ClassBased);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse(r#"{ "sender": { "host": "from-file", "port": 1111 } }"#);
        let cli = CliConfig {
            host: Some("from-cli".to_string()),
            sender: Some(SenderKind::Udp),
            period_secs: Some(5),
            ..CliConfig::default()
        };
        let config = AppConfig::from_file_config(file, &cli).unwrap();
        assert_eq!(config.sender.host, "from-cli");
        assert_eq!(config.sender.port, 1111);
        assert_eq!(config.sender.kind, SenderKind::Udp);
        assert_eq!(config.reporter.period, Duration::from_secs(5));
    }

    #[test]
    fn test_measurement_mapping_overrides_keep_order() {
        let file = parse(
            r#"{ "reporter": { "measurement_mappings": {
                "zeta": ".*zeta.*",
                "auth": "",
                "health": ".*\\.healthcheck.*",
                "alpha": ".*alpha.*"
            } } }"#,
        );
        let config = AppConfig::from_file_config(file, &CliConfig::default()).unwrap();
        let names: Vec<&str> = config
            .reporter
            .measurement_mappings
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();

        assert_eq!(names.len(), 13);
        assert_eq!(names[0], "health");
        assert!(!names.contains(&"auth"));
        assert_eq!(&names[11..], &["zeta", "alpha"]);
        assert_eq!(config.reporter.measurement_mappings[0].1, r".*\.healthcheck.*");
    }

    #[test]
    fn test_replace_default_mapping_table() {
        let file = parse(
            r#"{ "reporter": { "default_measurement_mappings": { "only": "only\\..*" } } }"#,
        );
        let config = AppConfig::from_file_config(file, &CliConfig::default()).unwrap();
        assert_eq!(
            config.reporter.measurement_mappings,
            vec![("only".to_string(), r"only\..*".to_string())]
        );
    }

    #[test]
    fn test_position_based_transformer_config() {
        let file = parse(
            r#"{ "reporter": { "transformer": {
                "type": "position_based",
                "categories": { "service": { "position": 1, "mapping": "app\\..*" } }
            } } }"#,
        );
        let config = AppConfig::from_file_config(file, &CliConfig::default()).unwrap();
        let transformer = config.reporter.transformer.build().unwrap();
        let tags = transformer.tags("app.billing.requests");
        assert_eq!(tags.get("service").map(String::as_str), Some("billing"));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            r#"{ "sender": { "host": "" } }"#,
            r#"{ "sender": { "port": 0 } }"#,
            r#"{ "sender": { "read_timeout_ms": 0 } }"#,
            r#"{ "sender": { "type": "pubsub", "database": "metrics" } }"#,
            r#"{ "sender": { "group_measurement": "" } }"#,
            r#"{ "reporter": { "period_secs": 0 } }"#,
            r#"{ "reporter": { "measurement_mappings": { "bad": "(" } } }"#,
            r#"{ "reporter": { "transformer": { "type": "position_based", "categories": { "x": { "position": -1, "pattern": ".*" } } } } }"#,
        ];
        for json in cases {
            let result = AppConfig::from_file_config(parse(json), &CliConfig::default());
            let err = result.expect_err(json);
            assert!(
                format!("{err:#}").contains("Configuration error"),
                "unexpected error for {json}: {err:#}"
            );
        }
    }

    #[test]
    fn test_logger_sender_skips_endpoint_checks() {
        let file = parse(r#"{ "sender": { "type": "logger", "host": "", "port": 0 } }"#);
        assert!(AppConfig::from_file_config(file, &CliConfig::default()).is_ok());
    }

    #[test]
    fn test_unknown_fields_collected() {
        let file = parse(r#"{ "sender": {}, "sendr": {}, "debug": true }"#);
        let mut unknown = file.unknown_fields();
        unknown.sort();
        assert_eq!(unknown, vec!["debug", "sendr"]);
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = parse(
            r#"{ "sender": { "host": "base", "port": 1 }, "reporter": { "fields": { "timers": ["p50"], "meters": ["m1_rate"] } } }"#,
        );
        let overlay = parse(
            r#"{ "sender": { "port": 2 }, "reporter": { "fields": { "timers": ["p99"] } } }"#,
        );
        base.merge(overlay);

        let sender = base.sender.as_ref().unwrap();
        assert_eq!(sender.host.as_deref(), Some("base"));
        assert_eq!(sender.port, Some(2));
        let fields = base.reporter.as_ref().unwrap().fields.as_ref().unwrap();
        assert_eq!(fields.timers, Some(to_set(&["p99"])));
        assert_eq!(fields.meters, Some(to_set(&["m1_rate"])));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reporter.json");
        fs::write(&path, r#"{ "sender": { "database": "from_file" } }"#).unwrap();

        let cli = CliConfig {
            config: Some(path),
            ..CliConfig::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.sender.database, "from_file");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            config: Some(dir.path().join("missing.json")),
            ..CliConfig::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = FileConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_excludes_replaced_by_file() {
        let config = AppConfig::from_file_config(FileConfig::default(), &CliConfig::default())
            .unwrap();
        assert_eq!(config.reporter.excludes.len(), 18);
        assert!(config.reporter.excludes.contains("jvm.attribute.name"));
        assert!(!config.reporter.options().filter.matches("jvm.memory.heap.usage"));
        assert!(config.reporter.options().filter.matches("jvm.memory.heap.used"));

        let file = parse(r#"{ "reporter": { "excludes": ["noisy.metric"] } }"#);
        let config = AppConfig::from_file_config(file, &CliConfig::default()).unwrap();
        assert_eq!(config.reporter.excludes, to_set(&["noisy.metric"]));
        assert!(config.reporter.options().filter.matches("jvm.attribute.name"));
    }

    #[test]
    fn test_reporter_builder_from_config() {
        let config = ReporterConfig::default();
        let options = config.options();
        assert!(options.group_gauges);
        assert_eq!(options.include_meter_fields, Some(to_set(&["m1_rate"])));
        assert!(config.builder().is_ok());
    }
}
