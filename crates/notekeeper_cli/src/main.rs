//! `notekeeper` command-line host.
//!
//! # Responsibility
//! - Resolve configuration, start logging, open the store.
//! - Validate user input and drive core note/reminder use-cases.

mod commands;
mod config;
mod time;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{AppConfig, GlobalArgs};
use notekeeper_core::db::open_db;
use notekeeper_core::init_logging;

#[derive(Debug, Parser)]
#[command(name = "notekeeper", version, about = "Notes with due-time reminders")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(&cli.global)?;
    init_logging(&config.log_level, config.log_target.clone()).map_err(|err| anyhow!(err))?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    commands::run(cli.command, &conn)
}
