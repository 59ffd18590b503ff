mod budget;
mod calendar;
mod config;
mod db;
mod edit;
mod error;
mod expenses;
mod generation;
mod insights;
mod launch;
mod models;
mod notify;
mod report;
mod run;
mod service;
mod session;
mod state;
mod taxonomy;
mod ui;

#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::launch::LaunchParams;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env()?;
    config.ensure_dirs()?;
    init_logging(&config)?;

    info!(db = %config.db_path.display(), "starting");
    let mut db = db::Database::open(&config.db_path, &config.project)?;

    match args.len() {
        1 => run::as_tui(&mut db, &config, LaunchParams::default()),
        2.. => run::as_cli(&args, &mut db, &config),
        _ => {
            eprintln!("Usage: expensetui [command]");
            Ok(())
        }
    }
}

/// The TUI owns the terminal, so logs go to a file in the data directory.
fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .with_context(|| format!("Failed to open log file: {}", config.log_path.display()))?;
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
