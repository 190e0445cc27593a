// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths, identifiers and log filters)
pub const APP_NAME_LOWER: &str = "influx_reporter";

/// Binary name
pub const APP_BIN_NAME: &str = "influx-reporter";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "influx-reporter.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "INFLUX_REPORTER_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "INFLUX_REPORTER_LOG";

/// Environment variable for the InfluxDB host
pub const ENV_HOST: &str = "INFLUX_REPORTER_HOST";

/// Environment variable for the InfluxDB port
pub const ENV_PORT: &str = "INFLUX_REPORTER_PORT";

/// Environment variable for the target database
pub const ENV_DATABASE: &str = "INFLUX_REPORTER_DATABASE";

/// Environment variable for the sender kind
pub const ENV_SENDER: &str = "INFLUX_REPORTER_SENDER";

/// Environment variable for the report period
pub const ENV_PERIOD_SECS: &str = "INFLUX_REPORTER_PERIOD_SECS";

// =============================================================================
// Sender Defaults
// =============================================================================

/// Default URL scheme for the HTTP sender
pub const DEFAULT_PROTOCOL: &str = "http";

/// Default InfluxDB host
pub const DEFAULT_HOST: &str = "localhost";

/// Default InfluxDB port
pub const DEFAULT_PORT: u16 = 8086;

/// Default connect timeout (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1500;

/// Default read / socket timeout (milliseconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1500;

/// Write attempts per cycle on the TCP sender
pub const TCP_WRITE_ATTEMPTS: u32 = 2;

// =============================================================================
// Reporter Defaults
// =============================================================================

/// Default report period (seconds)
pub const DEFAULT_PERIOD_SECS: u64 = 60;

/// Timer fields reported when no allow-list is configured
pub const DEFAULT_TIMER_FIELDS: &[&str] = &["p50", "p99", "m1_rate"];

/// Meter fields reported when no allow-list is configured
pub const DEFAULT_METER_FIELDS: &[&str] = &["m1_rate"];

/// Built-in measurement table, in match order
pub const DEFAULT_MEASUREMENT_MAPPINGS: &[(&str, &str)] = &[
    ("health", r".*\.health.*"),
    ("auth", r".*\.auth.*"),
    ("dao", r".*\.(jdbi|dao).*"),
    ("resources", r".*\.resources?.*"),
    ("datasources", r"io\.dropwizard\.db\.ManagedPooledDataSource.*"),
    ("clients", r"org\.apache\.http\.client\.HttpClient.*"),
    (
        "client_connections",
        r"org\.apache\.http\.conn\.HttpClientConnectionManager.*",
    ),
    ("connections", r"org\.eclipse\.jetty\.server\.HttpConnectionFactory.*"),
    ("thread_pools", r"org\.eclipse\.jetty\.util\.thread\.QueuedThreadPool.*"),
    ("logs", r"ch\.qos\.logback\.core\.Appender.*"),
    ("http_server", r"io\.dropwizard\.jetty\.MutableServletContextHandler.*"),
    ("raw_sql", r"org\.skife\.jdbi\.v2\.DBI\.raw-sql"),
];

/// Metric names left out of reports unless `excludes` is configured
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "io.dropwizard.jetty.MutableServletContextHandler.percent-4xx-15m",
    "io.dropwizard.jetty.MutableServletContextHandler.percent-4xx-1m",
    "io.dropwizard.jetty.MutableServletContextHandler.percent-4xx-5m",
    "io.dropwizard.jetty.MutableServletContextHandler.percent-5xx-15m",
    "io.dropwizard.jetty.MutableServletContextHandler.percent-5xx-1m",
    "io.dropwizard.jetty.MutableServletContextHandler.percent-5xx-5m",
    "jvm.attribute.name",
    "jvm.attribute.vendor",
    "ch.qos.logback.core.Appender.trace",
    "ch.qos.logback.core.Appender.debug",
    "jvm.memory.heap.usage",
    "jvm.memory.non-heap.usage",
    "jvm.memory.pools.Code-Cache.usage",
    "jvm.memory.pools.Compressed-Class-Space.usage",
    "jvm.memory.pools.Metaspace.usage",
    "jvm.memory.pools.PS-Eden-Space.usage",
    "jvm.memory.pools.PS-Old-Gen.usage",
    "jvm.memory.pools.PS-Survivor-Space.usage",
];

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks during shutdown (seconds)
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;
