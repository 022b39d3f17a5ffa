mod cli;

use backstop_lib::util::init_logging;
use backstop_lib::{BackstopError, BackupType, Config, Result};
use clap::Parser;
use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let config = match Config::new(cli.db.clone(), cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, None);
            return report(e);
        }
    };
    init_logging(cli.verbose, config.log_path.as_deref());

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(e: BackstopError) -> ExitCode {
    log::error!("{}", e);
    eprintln!("{} {}", style("Error:").red().bold(), e);
    ExitCode::from(e.exit_code() as u8)
}

fn run(cli: cli::Cli, config: Config) -> Result<()> {
    let mut db = cli::init_database(&config)?;

    match cli.command {
        cli::Commands::Full(args) => {
            cli::backup::handle_run_command(&mut db, &config, BackupType::Full, args).map(|_| ())
        }

        cli::Commands::Smart(args) => {
            cli::backup::handle_run_command(&mut db, &config, BackupType::Smart, args).map(|_| ())
        }

        cli::Commands::Clean(args) => {
            cli::backup::handle_run_command(&mut db, &config, BackupType::Clean, args).map(|_| ())
        }

        cli::Commands::History { limit, json } => {
            cli::history::handle_history_command(&db, limit, json)
        }

        cli::Commands::Check { threshold } => {
            cli::check::handle_check_command(&db, config.threshold_days(threshold)).map(|_| ())
        }

        cli::Commands::Status => {
            cli::check::handle_status_command(&db, config.threshold_days(None))
        }

        cli::Commands::Menu => cli::menu::handle_menu_command(&mut db, &config),
    }
}
