//! OmniFlow - workflow orchestration engine
//!
//! Main entry point for the OmniFlow CLI.

mod cli;
mod cmd_inspect;
mod cmd_run;
mod register;

use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use omniflow_config::{ConfigLoader, ConfigValidator, LoggingConfig};

use crate::cli::{Cli, Commands};

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Console output goes to stderr so results on stdout stay machine-readable.
    let console = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr);

    let Some(log_dir) = &logging.dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .init();
        return Ok(());
    };

    std::fs::create_dir_all(log_dir)?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("omniflow")
        .filename_suffix("log")
        .max_log_files(30)
        .build(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes buffered lines on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config.logging)?;

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!("Config {}", err);
        }
        return Err(format!("invalid configuration in {}", cli.config.display()).into());
    }

    match cli.command {
        Commands::Run {
            plan,
            owner,
            timeout,
            quiet,
            format,
        } => {
            let options = cmd_run::RunOptions {
                owner,
                timeout,
                quiet,
                format,
            };
            cmd_run::handle_run(config, &plan, options).await
        }
        Commands::Validate { plan } => cmd_run::handle_validate(&plan),
        Commands::Schema => cmd_run::handle_schema(),
        Commands::List {
            owner,
            status,
            offset,
            limit,
            format,
        } => cmd_inspect::handle_list(&config, owner, status, offset, limit, format).await,
        Commands::Show { id, format } => cmd_inspect::handle_show(&config, &id, format).await,
    }
}
