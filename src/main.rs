//! Library Desk - command line entry point

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use library_desk::{
    cli::{self, input::Terminal, prompt::TerminalConfirm, Cli, Command},
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::{AutoConfirm, ConfirmationPort, Services},
    AppError, AppState,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = match err.downcast_ref::<AppError>() {
                Some(app_err) => {
                    app_err.trace();
                    if matches!(app_err, AppError::RollbackFailed { .. }) {
                        eprintln!("Transaction state is unknown; stopping.");
                    }
                    app_err.code().exit_code()
                }
                None => 1,
            };
            eprintln!("Error: {:#}", err);
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().map_err(AppError::from)?;

    let _guard = init_tracing(&config.logging);

    tracing::info!("Starting Library Desk v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .map_err(AppError::from)
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    let terminal = Terminal::spawn();
    let confirmation: Arc<dyn ConfirmationPort> = if cli.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(TerminalConfirm::new(terminal.clone()))
    };

    let repository = Repository::new(pool);
    let services = Services::new(repository.clone(), confirmation, config.loans.clone());

    let state = AppState {
        config: Arc::new(config),
        repository,
        services: Arc::new(services),
    };

    match cli.command {
        Command::Shell => cli::shell::run(&state, &terminal).await?,
        command => {
            if let Some(report) = cli::execute(&state, command).await? {
                println!("{}", report);
            }
        }
    }

    Ok(())
}

/// Install the global subscriber. The returned guard flushes the log file on
/// drop and must live as long as the program.
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_desk={}", config.level).into());

    let (writer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "library-desk.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }

    guard
}
