use crate::db::{parse_timestamp, FileRecord};
use crate::error::Result;
use rusqlite::{named_params, Connection, OptionalExtension};

type RawRecord = (String, i64, f64, Option<String>);

pub fn upsert_file_record(conn: &Connection, record: &FileRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO file_records (path, size_bytes, mtime, last_backup)
         VALUES (:path, :size_bytes, :mtime, :last_backup)
         ON CONFLICT(path) DO UPDATE SET
            size_bytes = excluded.size_bytes,
            mtime = excluded.mtime,
            last_backup = excluded.last_backup",
        named_params! {
            ":path": &record.path,
            ":size_bytes": record.size_bytes,
            ":mtime": record.mtime,
            ":last_backup": record.last_backup.to_rfc3339(),
        },
    )?;
    Ok(())
}

pub fn get_file_record(conn: &Connection, path: &str) -> Result<Option<FileRecord>> {
    let mut stmt = conn.prepare(
        "SELECT path, size_bytes, mtime, last_backup FROM file_records WHERE path = ?1",
    )?;

    let raw = stmt.query_row([path], read_raw).optional()?;
    raw.map(into_record).transpose()
}

pub fn delete_file_record(conn: &Connection, path: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM file_records WHERE path = ?1", [path])?;
    Ok(rows > 0)
}

pub fn list_file_records(conn: &Connection) -> Result<Vec<FileRecord>> {
    let mut stmt = conn.prepare(
        "SELECT path, size_bytes, mtime, last_backup FROM file_records ORDER BY path",
    )?;

    let raw = stmt
        .query_map([], read_raw)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter().map(into_record).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingStats {
    pub file_count: usize,
    pub total_bytes: i64,
}

pub fn get_tracking_stats(conn: &Connection) -> Result<TrackingStats> {
    let (file_count, total_bytes): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM file_records",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(TrackingStats {
        file_count: file_count as usize,
        total_bytes,
    })
}

fn read_raw(row: &rusqlite::Row) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_record((path, size_bytes, mtime, last_backup): RawRecord) -> Result<FileRecord> {
    let last_backup = match last_backup {
        Some(value) => parse_timestamp("file_records", &value)?,
        None => chrono::DateTime::<chrono::Utc>::default(),
    };

    Ok(FileRecord {
        path,
        size_bytes,
        mtime,
        last_backup,
    })
}
