pub mod backup;
pub mod check;
pub mod history;
pub mod menu;

use backstop_lib::{BackstopError, Config, Result, SqliteDatabase};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "backstop")]
#[command(about = "Personal backups with incremental copies, orphan cleanup and overdue alerts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to database file")]
    pub db: Option<PathBuf>,

    #[arg(long, global = true, help = "Path to settings file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[arg(help = "Source directory (defaults to the configured source)")]
    pub source: Option<PathBuf>,

    #[arg(help = "Backup directory (defaults to the configured destination)")]
    pub destination: Option<PathBuf>,

    #[arg(long, help = "Show what would change without touching files or the database")]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Copy every source file to the backup directory")]
    Full(RunArgs),

    #[command(about = "Copy only new, resized or missing files")]
    Smart(RunArgs),

    #[command(about = "Remove backup files that no longer exist in the source")]
    Clean(RunArgs),

    #[command(about = "Show backup history, most recent first")]
    History {
        #[arg(long, help = "Maximum number of entries to show")]
        limit: Option<u32>,

        #[arg(long, help = "Print history as JSON")]
        json: bool,
    },

    #[command(about = "Check whether a backup is overdue")]
    Check {
        #[arg(long, help = "Days after which a backup is overdue")]
        threshold: Option<i64>,
    },

    #[command(about = "Show tracked files and backup state")]
    Status,

    #[command(about = "Interactive menu")]
    Menu,
}

pub fn init_database(config: &Config) -> Result<SqliteDatabase> {
    config
        .ensure_db_directory()
        .map_err(|e| BackstopError::StoreInit {
            path: config.db_path.clone(),
            message: e.to_string(),
        })?;

    let db = SqliteDatabase::open_initialized(&config.db_path)?;
    log::debug!("Using database {}", config.db_path.display());

    Ok(db)
}
