//! Flight Monitor CLI
//!
//! Local entry point: one-off scans, long-running monitoring and the HTTP
//! control surface.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use flight_monitor::{
    error::{AppError, Result},
    models::Config,
    pipeline::ScanPipeline,
    services::Scheduler,
};

/// Flight Monitor - watch a flight deals page for new destinations
#[derive(Parser, Debug)]
#[command(
    name = "flight-monitor",
    version,
    about = "Flight destination change monitor"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single scan and print the result as JSON
    Scan {
        /// Page to scan (default: monitor.default_url)
        #[arg(long)]
        url: Option<String>,
    },

    /// Scan on an interval until interrupted
    Monitor {
        /// Page to monitor (default: monitor.default_url)
        #[arg(long)]
        url: Option<String>,

        /// Minutes between scans (default: monitor.default_interval_minutes)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Serve the HTTP control API
    #[cfg(feature = "server")]
    Serve {
        /// Listening port (default: server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration
    Validate,

    /// Send a test SMS
    SmsTest {
        /// Recipient (default: the alert number)
        #[arg(long)]
        phone: Option<String>,

        /// Message body
        #[arg(long)]
        message: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn build_pipeline(config: &Config) -> Result<Arc<ScanPipeline>> {
    Ok(Arc::new(ScanPipeline::from_config(config)?))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = dotenvy::dotenv() {
        log::debug!("No .env file loaded: {}", e);
    }

    log::info!("Flight monitor starting...");

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();

    match cli.command {
        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} destinations, SMS {})",
                config.extraction.destinations.len(),
                if config.sms.has_credentials() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }

        Command::Scan { url } => {
            let pipeline = build_pipeline(&config)?;
            let url = url.unwrap_or_else(|| config.monitor.default_url.clone());
            let record = pipeline.run(&url).await;
            println!("{}", serde_json::to_string_pretty(&record)?);

            if let Some(error) = &record.error {
                return Err(AppError::fetch(url, error));
            }
        }

        Command::Monitor { url, interval } => {
            let url = url.unwrap_or_else(|| config.monitor.default_url.clone());
            let interval = interval.unwrap_or(config.monitor.default_interval_minutes);

            let scheduler = Scheduler::new(build_pipeline(&config)?);
            let started = scheduler.start(&url, interval).await?;
            log::info!(
                "Initial scan: {} destinations, {} changes",
                started.initial_result.total_destinations,
                started.initial_result.total_changes
            );

            tokio::signal::ctrl_c().await?;
            log::info!("Shutting down gracefully...");
            scheduler.shutdown().await;
        }

        #[cfg(feature = "server")]
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let scheduler = Arc::new(Scheduler::new(build_pipeline(&config)?));
            flight_monitor::server::run(scheduler, &config).await?;
        }

        Command::SmsTest { phone, message } => {
            let pipeline = build_pipeline(&config)?;
            let sid = pipeline
                .notifier()
                .send_test(phone.as_deref(), message.as_deref())
                .await?;
            log::info!("Test SMS sent: {}", sid);
        }
    }

    Ok(())
}
