//! Log sink: hands the rendered batch to `tracing` instead of the network

/// Writes line protocol through the log at `info`
#[derive(Debug, Clone, Default)]
pub struct LogSender {
    database: String,
}

impl LogSender {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    pub fn send(&self, body: &str) -> u16 {
        tracing::info!(
            target: "influx_reporter::line_protocol",
            database = %self.database,
            lines = body.lines().count(),
            "{}",
            body.trim_end()
        );
        0
    }
}
