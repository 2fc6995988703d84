//! `taskflow`: personal task tracker with due-date notifications.
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskflow/config.toml`).
//!
//! ```bash
//! taskflow login alice
//! taskflow add "Submit report" --due "2026-05-01 17:00" --priority high
//! taskflow list --status active --sort priority
//! taskflow move todo-3 --before todo-1
//! taskflow watch
//! ```

use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskflow::commands;
use taskflow::config::{CliArgs, ClientConfig, Command, ListArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Logs go to a file so stdout stays clean for command output.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let command = cli
        .command
        .unwrap_or_else(|| Command::List(ListArgs::default()));
    tracing::info!(?command, api_url = %config.api_url, "taskflow starting");

    let mut stdout = io::stdout();
    match commands::run(command, &config, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskflow.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
