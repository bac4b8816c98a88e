//! Fileshare CLI - manage a fileshare account from the terminal.
//!
//! Every command restores the persisted session first, so an expired access
//! credential is refreshed transparently before the command runs.

mod commands;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fileshare_core::{AuthStatePublisher, Config, SessionClient};

use commands::Command;

// ============================================================================
// Constants
// ============================================================================

const LOG_FILE_PREFIX: &str = "fileshare.log";

/// Initialize the tracing subscriber for logging.
///
/// Events go to stderr, filtered by `RUST_LOG` (default `warn`). When the data
/// directory is available a daily log file under `logs/` receives the same
/// events; the returned guard flushes it on drop.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.data_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    config.apply_env()?;

    let _log_guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n", e);
            eprintln!("{}", commands::USAGE);
            std::process::exit(2);
        }
    };

    if let Command::Help = command {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    info!(api = %config.api_base_url, "Fileshare CLI starting");

    let session = SessionClient::from_config(&config)?;
    let publisher = AuthStatePublisher::new(session);

    if let Err(e) = commands::run(command, &publisher, &mut config).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
