use std::str::FromStr;
use std::sync::Once;
use std::{env, process};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;
use thiserror::Error;

use copilot_fx_core::core::config::{ApplicationProperties, ConfigError};
use copilot_fx_core::core::metrics::{MetricsError, MetricsManager, MetricsReader};
use copilot_fx_core::core::storage::Storage;
use copilot_fx_github::github::GithubUsageProvider;

mod report;
mod sync;

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FORMAT_CONSOLE: &str = "\x1B[37m{d(%Y-%m-%d %H:%M:%S%.3f)}\x1B[0m {h({l:>5.5})} \x1B[35m{I:>6.6}\x1B[0m \x1B[37m---\x1B[0m \x1B[36m{t:<40.40}\x1B[0m \x1B[37m:\x1B[0m {m}{n}";
const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
const DEFAULT_DATA_DIRECTORY: fn() -> String = || "data".to_string();

static INIT: Once = Once::new();

/// Represents errors that terminate a Copilot FX invocation.
#[derive(Debug, Error)]
pub enum CopilotFxError {
    /// The application configuration is incomplete or invalid.
    #[error("invalid configuration, {0}")]
    Config(#[from] ConfigError),
    /// A metrics operation failed.
    #[error("{0}")]
    Metrics(#[from] MetricsError),
}

/// The options for the Copilot FX application.
#[derive(Debug, Clone, Parser)]
#[command(name = "copilot-metrics", about = "Collects and reports GitHub Copilot usage metrics")]
pub struct CopilotFxArgs {
    /// The directory containing the metric snapshot files.
    #[arg(long, default_value_t = DEFAULT_DATA_DIRECTORY())]
    pub data_directory: String,
    #[command(subcommand)]
    pub command: Command,
    /// The properties of the application which are constant during its lifecycle
    #[arg(skip = ApplicationProperties::new_auto())]
    pub properties: ApplicationProperties,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch the latest usage metrics and merge them into the local history
    Sync {
        /// Fetch even when the last completed sync is still fresh
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print summary statistics over the accumulated history
    Report {
        /// The first day of the reported range, formatted as YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// The last day of the reported range, formatted as YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Aggregate the reported range into weekly buckets
        #[arg(long, default_value_t = false)]
        weekly: bool,
    },
}

/// The main entry of the Copilot FX application.
#[tokio::main]
async fn main() {
    let args = CopilotFxArgs::parse();
    initialize_logger();

    if let Err(e) = run(args).await {
        error!("Copilot FX failed, {}", e);
        process::exit(1);
    }
}

async fn run(args: CopilotFxArgs) -> Result<(), CopilotFxError> {
    let data_directory = args.data_directory.as_str();

    match args.command {
        Command::Sync { force } => {
            args.properties.github().validate()?;
            let provider = GithubUsageProvider::new(args.properties.github().clone(), data_directory);
            let manager = MetricsManager::new(data_directory);
            let storage = Storage::from(data_directory);

            let outcome = sync::run_sync(
                &provider,
                &manager,
                &storage,
                args.properties.sync().cache_ttl_hours(),
                force,
            )
            .await?;

            info!("Sync completed, {}", outcome);
            Ok(())
        }
        Command::Report { from, to, weekly } => {
            let reader = MetricsReader::new(Storage::from(data_directory));
            report::run_report(&reader, from, to, weekly);
            Ok(())
        }
    }
}

fn initialize_logger() {
    INIT.call_once(|| {
        let root_level = env::var(ENV_LOG_LEVEL).unwrap_or("Info".to_string());
        let config = Config::builder()
            .appender(Appender::builder().build(
                CONSOLE_APPENDER,
                Box::new(
                    ConsoleAppender::builder()
                        .encoder(Box::new(PatternEncoder::new(LOG_FORMAT_CONSOLE)))
                        .build(),
                ),
            ))
            .logger(Logger::builder().build("hyper", LevelFilter::Info))
            .logger(Logger::builder().build("hyper_util", LevelFilter::Info))
            .logger(Logger::builder().build("reqwest", LevelFilter::Info))
            .build(
                Root::builder()
                    .appender(CONSOLE_APPENDER)
                    .build(LevelFilter::from_str(root_level.as_str()).unwrap_or(LevelFilter::Info)),
            )
            .expect("expected a valid logger configuration");

        if let Err(e) = log4rs::init_config(config) {
            eprintln!("Failed to initialize the logger, {}", e);
        }
    })
}
