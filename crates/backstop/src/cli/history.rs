use backstop_lib::util::format_timestamp;
use backstop_lib::{HistoryDatabase, Result, SqliteDatabase};
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;

pub fn handle_history_command(db: &SqliteDatabase, limit: Option<u32>, json: bool) -> Result<()> {
    let entries = db.list_history(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", style("No backups recorded yet").yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Completed").fg(Color::Cyan),
        Cell::new("Files").fg(Color::Cyan),
        Cell::new("Source").fg(Color::Cyan),
        Cell::new("Destination").fg(Color::Cyan),
    ]);

    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(entry.backup_type.as_str()),
            Cell::new(format_timestamp(&entry.timestamp)),
            Cell::new(entry.file_count),
            Cell::new(entry.source_path.as_deref().unwrap_or("-")),
            Cell::new(entry.backup_path.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{}", table);
    Ok(())
}
