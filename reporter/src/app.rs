use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::senders::InfluxSender;
use crate::domain::reporter::{CycleCounters, CycleOutcome, Reporter, ScheduledReporter};
use crate::domain::runtime::RuntimeMetrics;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub counters: Arc<CycleCounters>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config)?;
        match command {
            Some(Commands::Check) => {
                app.print_summary();
                Ok(())
            }
            Some(Commands::Report) => app.report_once().await,
            Some(Commands::Start) | None => app.start().await,
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            counters: Arc::new(CycleCounters::default()),
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    /// Build the sender and reporter from the loaded configuration
    pub fn build_reporter(&self) -> Result<Reporter> {
        let sender =
            InfluxSender::from_config(&self.config.sender).context("Failed to create sender")?;
        let reporter = self
            .config
            .reporter
            .builder()
            .context("Invalid reporter configuration")?
            .build(sender)
            .context("Failed to build reporter")?;
        Ok(reporter)
    }

    fn scheduled(&self) -> Result<ScheduledReporter> {
        let source = Arc::new(RuntimeMetrics::new(
            APP_NAME_LOWER,
            Arc::clone(&self.counters),
        ));
        Ok(
            ScheduledReporter::new(self.build_reporter()?, source, self.config.reporter.period)
                .with_counters(Arc::clone(&self.counters)),
        )
    }

    async fn report_once(self) -> Result<()> {
        let mut scheduled = self.scheduled()?;
        let outcome = scheduled.run_once().await;
        scheduled.drain().await;
        match outcome {
            CycleOutcome::Sent { points, status } => {
                println!("Reported {} points (status {})", points, status);
                Ok(())
            }
            CycleOutcome::Empty => {
                println!("Nothing to report");
                Ok(())
            }
            CycleOutcome::TransportError(e) | CycleOutcome::ConfigError(e) => {
                anyhow::bail!("Report cycle failed: {}", e)
            }
        }
    }

    async fn start(self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        self.shutdown.install_signal_handlers();

        let scheduled = self.scheduled()?;
        let handle = scheduled.start(self.shutdown.subscribe());
        self.shutdown.register(handle).await;

        tracing::info!(
            sender = %self.config.sender.kind,
            host = %self.config.sender.host,
            port = self.config.sender.port,
            database = %self.config.sender.database,
            period_secs = self.config.reporter.period.as_secs(),
            "Reporter started"
        );

        self.shutdown.wait().await;
        self.shutdown.shutdown().await;

        tracing::info!(
            cycles = self.counters.total(),
            sent = self.counters.sent(),
            failed = self.counters.failed(),
            points = self.counters.points(),
            "Reporter stopped"
        );
        Ok(())
    }

    fn print_summary(&self) {
        let sender = &self.config.sender;
        let reporter = &self.config.reporter;

        println!("Configuration OK");
        println!("  sender:     {}", sender.kind);
        if sender.kind.uses_endpoint() {
            println!("  endpoint:   {}:{}", sender.host, sender.port);
        }
        println!("  database:   {}", sender.database);
        println!("  precision:  {}", sender.precision);
        println!("  period:     {}s", reporter.period.as_secs());
        println!(
            "  mappings:   {}",
            reporter
                .measurement_mappings
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}
