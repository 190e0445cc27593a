use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::SenderKind;
use super::constants::{
    APP_BIN_NAME, ENV_CONFIG, ENV_DATABASE, ENV_HOST, ENV_PERIOD_SECS, ENV_PORT, ENV_SENDER,
};

#[derive(Parser)]
#[command(name = APP_BIN_NAME)]
#[command(version, about = "Periodic InfluxDB metrics reporter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// InfluxDB host
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// InfluxDB port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Target database (`topic@broker1,broker2` for the pubsub sender)
    #[arg(long, short = 'd', global = true, env = ENV_DATABASE)]
    pub database: Option<String>,

    /// Sender (http, tcp, udp, logger or pubsub)
    #[arg(long, short = 's', global = true, env = ENV_SENDER, value_parser = parse_sender_kind)]
    pub sender: Option<SenderKind>,

    /// Seconds between reports
    #[arg(long, global = true, env = ENV_PERIOD_SECS)]
    pub period_secs: Option<u64>,
}

/// Parse sender kind from CLI/env string
fn parse_sender_kind(s: &str) -> Result<SenderKind, String> {
    match s.to_lowercase().as_str() {
        "http" => Ok(SenderKind::Http),
        "tcp" => Ok(SenderKind::Tcp),
        "udp" => Ok(SenderKind::Udp),
        "logger" | "log" => Ok(SenderKind::Logger),
        "pubsub" | "kafka" => Ok(SenderKind::PubSub),
        _ => Err(format!(
            "Invalid sender '{}'. Valid options: http, tcp, udp, logger, pubsub",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Report on a fixed period until interrupted (default command)
    Start,
    /// Run a single report cycle and exit
    Report,
    /// Validate configuration and print the resolved settings
    Check,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub sender: Option<SenderKind>,
    pub period_secs: Option<u64>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            config: cli.config,
            host: cli.host,
            port: cli.port,
            database: cli.database,
            sender: cli.sender,
            period_secs: cli.period_secs,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (CliConfig::from(cli), command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sender_kind() {
        assert_eq!(parse_sender_kind("HTTP"), Ok(SenderKind::Http));
        assert_eq!(parse_sender_kind("log"), Ok(SenderKind::Logger));
        assert_eq!(parse_sender_kind("kafka"), Ok(SenderKind::PubSub));
        let err = parse_sender_kind("smtp").unwrap_err();
        assert!(err.contains("Invalid sender 'smtp'"));
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            APP_BIN_NAME,
            "report",
            "--host",
            "influx.local",
            "-p",
            "9999",
            "--sender",
            "udp",
            "--period-secs",
            "15",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Report));

        let config = CliConfig::from(cli);
        assert_eq!(config.host.as_deref(), Some("influx.local"));
        assert_eq!(config.port, Some(9999));
        assert_eq!(config.sender, Some(SenderKind::Udp));
        assert_eq!(config.period_secs, Some(15));
    }

    #[test]
    fn test_cli_rejects_unknown_sender() {
        assert!(Cli::try_parse_from([APP_BIN_NAME, "--sender", "carrier-pigeon"]).is_err());
    }
}
