use crate::cli::{backup, check, history, RunArgs};
use backstop_lib::{BackupType, Config, Result, SqliteDatabase};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::path::PathBuf;

const ITEMS: &[&str] = &[
    "Smart backup (changed files only)",
    "Full backup (copy everything)",
    "Clean backup (remove orphaned files)",
    "Show history",
    "Check backup status",
    "Quit",
];

pub fn handle_menu_command(db: &mut SqliteDatabase, config: &Config) -> Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        println!();
        let choice = Select::with_theme(&theme)
            .with_prompt("Backstop")
            .items(ITEMS)
            .default(0)
            .interact()?;

        let outcome = match choice {
            0 => run_mode(db, config, &theme, BackupType::Smart),
            1 => run_mode(db, config, &theme, BackupType::Full),
            2 => run_mode(db, config, &theme, BackupType::Clean),
            3 => history::handle_history_command(db, Some(20), false),
            4 => check::handle_check_command(db, config.threshold_days(None)).map(|_| ()),
            _ => return Ok(()),
        };

        // Errors from one action are shown and the menu continues.
        if let Err(e) = outcome {
            println!("{} {}", style("Error:").red().bold(), e);
        }
    }
}

fn run_mode(
    db: &mut SqliteDatabase,
    config: &Config,
    theme: &ColorfulTheme,
    backup_type: BackupType,
) -> Result<()> {
    let source = prompt_path(theme, "Source directory", config.settings.source.as_ref())?;
    let destination = prompt_path(theme, "Backup directory", config.settings.destination.as_ref())?;

    if backup_type == BackupType::Clean {
        let confirmed = Confirm::with_theme(theme)
            .with_prompt(format!(
                "Delete files in {} that are not in {}?",
                destination.display(),
                source.display()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Clean cancelled").dim());
            return Ok(());
        }
    }

    let args = RunArgs {
        source: Some(source),
        destination: Some(destination),
        dry_run: false,
    };
    backup::handle_run_command(db, config, backup_type, args).map(|_| ())
}

fn prompt_path(theme: &ColorfulTheme, prompt: &str, default: Option<&PathBuf>) -> Result<PathBuf> {
    let mut input = Input::<String>::with_theme(theme).with_prompt(prompt);
    if let Some(path) = default {
        input = input.default(path.display().to_string());
    }
    let value = input.interact_text()?;
    Ok(PathBuf::from(value.trim()))
}
