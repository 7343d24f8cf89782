//! Runtime configuration for the CLI host.
//!
//! Values come from flags, then `NOTEKEEPER_*` environment variables, then
//! platform defaults.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use directories::ProjectDirs;
use notekeeper_core::{default_log_level, LogTarget};
use std::path::PathBuf;

const DB_FILE_NAME: &str = "notekeeper.sqlite3";
const INTERACTIVE_LOG_LEVEL: &str = "warn";

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// SQLite database file.
    #[arg(long, global = true, env = "NOTEKEEPER_DB")]
    pub db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "NOTEKEEPER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr otherwise.
    #[arg(long, global = true, env = "NOTEKEEPER_LOG_DIR")]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_target: LogTarget,
}

impl AppConfig {
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        let db_path = match &args.db {
            Some(path) => path.clone(),
            None => default_db_path()?,
        };

        let log_target = match args.log_dir.as_deref() {
            Some(dir) => LogTarget::directory(dir).map_err(|err| anyhow!(err))?,
            None => LogTarget::Stderr,
        };

        // Stderr shares the terminal with command output; keep it quiet.
        let fallback_level = match log_target {
            LogTarget::Stderr => INTERACTIVE_LOG_LEVEL,
            LogTarget::Directory(_) => default_log_level(),
        };

        Ok(Self {
            db_path,
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| fallback_level.to_string()),
            log_target,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "notekeeper")
        .ok_or_else(|| anyhow!("could not determine a home directory; pass --db"))?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
    Ok(data_dir.join(DB_FILE_NAME))
}
