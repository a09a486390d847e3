//! Batch runner: executes a file of SQL statements, one per line, through
//! `Db::exec_batch`.
//!
//! Usage: `sqlkit <statements.sql> [settings.toml]`

use std::path::Path;
use std::process::ExitCode;

use sqlkit::db::Db;
use sqlkit::settings::Settings;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(script) = args.next() else {
        eprintln!("usage: sqlkit <statements.sql> [settings.toml]");
        return ExitCode::from(2);
    };
    let settings_file = args.next();

    let settings = match Settings::load(settings_file.as_deref().map(Path::new)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let text = match std::fs::read_to_string(&script) {
        Ok(text) => text,
        Err(e) => {
            error!(%script, error = %e, "could not read statements");
            return ExitCode::FAILURE;
        }
    };
    let statements: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .collect();

    let outcome = Db::open(&settings.database).and_then(|db| db.exec_batch(&statements));
    match outcome {
        Ok(outcome) if outcome.is_ok() => {
            info!(statements = statements.len(), chunks = outcome.attempted, "batch complete");
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            for failure in &outcome.failures {
                error!(chunk = failure.index, error = %failure.error, "chunk failed");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "batch aborted");
            ExitCode::FAILURE
        }
    }
}
