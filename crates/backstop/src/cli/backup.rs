use crate::cli::RunArgs;
use backstop_lib::util::{create_spinner, format_bytes, format_duration};
use backstop_lib::{BackupEngine, BackupSummary, BackupType, Config, EngineOptions, Result, SqliteDatabase};
use console::style;
use std::time::Duration;

pub fn handle_run_command(
    db: &mut SqliteDatabase,
    config: &Config,
    backup_type: BackupType,
    args: RunArgs,
) -> Result<BackupSummary> {
    let (source, dest) = config.resolve_paths(args.source, args.destination)?;

    let options = EngineOptions {
        dry_run: args.dry_run,
        follow_symlinks: config.settings.follow_symlinks,
    };

    println!(
        "{} {} backup {} -> {}{}",
        style(">>>").cyan(),
        style(capitalize(backup_type.as_str())).bold(),
        source.display(),
        dest.display(),
        if args.dry_run { " (dry run)" } else { "" }
    );

    let spinner = create_spinner(backup_type.as_str());
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut engine = BackupEngine::new(db, options).with_progress(spinner.clone());
    let result = match backup_type {
        BackupType::Full => engine.run_full(&source, &dest),
        BackupType::Smart => engine.run_smart(&source, &dest),
        BackupType::Clean => engine.run_clean(&source, &dest),
    };
    spinner.finish_and_clear();

    let summary = result?;
    print_summary(&summary);

    Ok(summary)
}

pub fn print_summary(summary: &BackupSummary) {
    let (copied_label, removed_label) = if summary.dry_run {
        ("Files to copy", "Files to remove")
    } else {
        ("Files copied", "Files removed")
    };

    println!("\n{} {} backup completed", style("✓").green(), summary.backup_type);

    match summary.backup_type {
        BackupType::Full | BackupType::Smart => {
            println!("  {}: {}", copied_label, style(summary.copied).cyan());
            if summary.backup_type == BackupType::Smart {
                println!("  Files skipped: {}", style(summary.skipped).dim());
            }
            println!("  Data copied: {}", style(format_bytes(summary.bytes_copied)).cyan());
        }
        BackupType::Clean => {
            println!("  {}: {}", removed_label, style(summary.removed).cyan());
            if summary.dirs_removed > 0 {
                println!("  Empty directories removed: {}", style(summary.dirs_removed).dim());
            }
        }
    }

    if summary.errors > 0 {
        println!("  Errors: {}", style(summary.errors).yellow());
    } else {
        println!("  Errors: {}", summary.errors);
    }

    let elapsed = (summary.finished_at - summary.started_at)
        .to_std()
        .unwrap_or_default();
    println!("  Duration: {}", format_duration(elapsed));

    if let Some(id) = summary.history_id {
        println!("  Recorded as history entry #{}", id);
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
