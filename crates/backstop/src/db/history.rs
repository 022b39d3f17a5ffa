use crate::db::{parse_timestamp, BackupHistoryEntry, BackupType};
use crate::error::Result;
use rusqlite::OptionalExtension;

type RawEntry = (i64, String, String, i64, Option<String>, Option<String>);

/// Append-only log of completed backup runs.
pub trait HistoryDatabase {
    fn append_history(&mut self, entry: &BackupHistoryEntry) -> Result<i64>;
    /// Most recent first.
    fn list_history(&self, limit: Option<u32>) -> Result<Vec<BackupHistoryEntry>>;
    fn latest_history(&self) -> Result<Option<BackupHistoryEntry>>;
    fn count_history(&self) -> Result<i64>;
}

impl HistoryDatabase for crate::db::SqliteDatabase {
    fn append_history(&mut self, entry: &BackupHistoryEntry) -> Result<i64> {
        let conn = self.conn_mut();
        conn.execute(
            "INSERT INTO backup_history (backup_type, timestamp, file_count, source_path, backup_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                entry.backup_type.as_str(),
                entry.timestamp.to_rfc3339(),
                entry.file_count,
                &entry.source_path,
                &entry.backup_path,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_history(&self, limit: Option<u32>) -> Result<Vec<BackupHistoryEntry>> {
        let conn = self.conn();
        let mut query = "SELECT id, backup_type, timestamp, file_count, source_path, backup_path
                         FROM backup_history ORDER BY id DESC"
            .to_string();

        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(lim) = limit {
            query.push_str(" LIMIT ?");
            params.push(Box::new(lim));
        }

        let mut stmt = conn.prepare(&query)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let raw = stmt
            .query_map(&param_refs[..], read_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter().map(into_entry).collect()
    }

    fn latest_history(&self) -> Result<Option<BackupHistoryEntry>> {
        let raw = self
            .conn()
            .query_row(
                "SELECT id, backup_type, timestamp, file_count, source_path, backup_path
                 FROM backup_history ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                read_raw,
            )
            .optional()?;

        raw.map(into_entry).transpose()
    }

    fn count_history(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM backup_history", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn read_raw(row: &rusqlite::Row) -> rusqlite::Result<RawEntry> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_entry(
    (id, backup_type, timestamp, file_count, source_path, backup_path): RawEntry,
) -> Result<BackupHistoryEntry> {
    Ok(BackupHistoryEntry {
        id,
        backup_type: BackupType::from_str(&backup_type)?,
        timestamp: parse_timestamp("backup_history", &timestamp)?,
        file_count,
        source_path,
        backup_path,
    })
}
