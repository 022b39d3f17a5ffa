use backstop_lib::db::files::get_tracking_stats;
use backstop_lib::util::{format_bytes, format_date, format_timestamp};
use backstop_lib::{check_overdue, HistoryDatabase, OverdueStatus, Result, SqliteDatabase};
use console::style;

pub fn handle_check_command(db: &SqliteDatabase, threshold_days: i64) -> Result<OverdueStatus> {
    let status = check_overdue(db, threshold_days);
    print_status(&status, threshold_days);
    Ok(status)
}

fn print_status(status: &OverdueStatus, threshold_days: i64) {
    match status {
        OverdueStatus::NoHistory => {
            print_banner(&[
                "No backup history found.".to_string(),
                "Run your first backup today: backstop smart".to_string(),
            ]);
        }
        OverdueStatus::Overdue {
            last_backup,
            days_since,
        } => {
            log::warn!(
                "Backup overdue by {} days",
                days_since - threshold_days
            );
            print_banner(&[
                format!("Last backup: {}", format_timestamp(last_backup)),
                format!("Days since backup: {}", days_since),
                "Your data is important. Please back it up today: backstop smart".to_string(),
            ]);
        }
        OverdueStatus::Fresh { last_backup, .. } => {
            println!("\n{} Backup status: OK", style("✓").green());
            println!("  Last backup: {}", format_timestamp(last_backup));
            if let Some(next) = status.next_due(threshold_days) {
                println!("  Next backup recommended: {}\n", format_date(&next));
            }
        }
    }
}

fn print_banner(lines: &[String]) {
    let rule = "=".repeat(60);
    println!("\n{}", style(&rule).yellow());
    println!("{}", style("⚠  BACKUP ALERT!").yellow().bold());
    println!("{}", style(&rule).yellow());
    for line in lines {
        println!("{}", line);
    }
    println!("{}\n", style(&rule).yellow());
}

pub fn handle_status_command(db: &SqliteDatabase, threshold_days: i64) -> Result<()> {
    println!("\n{}", style("Backstop Status").bold().cyan());
    println!("{}\n", style("═".repeat(60)).dim());

    let stats = get_tracking_stats(db.conn())?;
    println!("{}", style("Tracked files").bold());
    println!("  Files: {}", style(stats.file_count).cyan());
    println!("  Total size: {}", style(format_bytes(stats.total_bytes.max(0) as u64)).cyan());
    println!();

    println!("{}", style("History").bold());
    println!("  Runs recorded: {}", db.count_history()?);
    if let Some(latest) = db.latest_history()? {
        println!(
            "  Latest run: {} at {} ({} files)",
            latest.backup_type,
            format_timestamp(&latest.timestamp),
            latest.file_count
        );
    }
    println!();

    let status = check_overdue(db, threshold_days);
    println!("{}", style("Backup state").bold());
    match &status {
        OverdueStatus::NoHistory => println!("  {}", style("No backup recorded").yellow()),
        OverdueStatus::Fresh { days_since, .. } => println!(
            "  {} ({} days since last backup, threshold {})",
            style("Up to date").green(),
            days_since,
            threshold_days
        ),
        OverdueStatus::Overdue { days_since, .. } => println!(
            "  {} ({} days since last backup, threshold {})",
            style("Overdue").red(),
            days_since,
            threshold_days
        ),
    }

    Ok(())
}
