pub mod files;
pub mod history;
pub mod schema;
pub mod settings;

use crate::error::{BackstopError, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub use history::HistoryDatabase;
pub use settings::{SettingsDatabase, LAST_BACKUP_KEY};

/// Tracking state for one file under the backup tree, keyed by its path
/// relative to the tree root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub size_bytes: i64,
    /// Seconds since the Unix epoch, as reported by the source filesystem.
    pub mtime: f64,
    pub last_backup: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Full,
    Smart,
    Clean,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Full => "full",
            BackupType::Smart => "smart",
            BackupType::Clean => "clean",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(BackupType::Full),
            "smart" => Ok(BackupType::Smart),
            "clean" => Ok(BackupType::Clean),
            _ => Err(BackstopError::corrupt(
                "backup_history",
                format!("Invalid backup type: {}", s),
            )),
        }
    }

    /// Whether a completed run of this type counts as a data backup.
    pub fn updates_last_backup(&self) -> bool {
        !matches!(self, BackupType::Clean)
    }
}

impl std::fmt::Display for BackupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupHistoryEntry {
    pub id: i64,
    pub backup_type: BackupType,
    pub timestamp: DateTime<Utc>,
    pub file_count: i64,
    pub source_path: Option<String>,
    pub backup_path: Option<String>,
}

/// File-record operations used by the backup engine.
pub trait Database {
    fn initialize(&mut self) -> Result<()>;
    fn get_file_record(&self, path: &str) -> Result<Option<FileRecord>>;
    fn upsert_file_record(&mut self, record: &FileRecord) -> Result<()>;
    /// Returns `true` when a record existed and was removed.
    fn delete_file_record(&mut self, path: &str) -> Result<bool>;
    fn list_file_records(&self) -> Result<Vec<FileRecord>>;

    /// Every record keyed by path, for constant-time lookups during a smart
    /// run.
    fn file_record_map(&self) -> Result<HashMap<String, FileRecord>> {
        Ok(self
            .list_file_records()?
            .into_iter()
            .map(|record| (record.path.clone(), record))
            .collect())
    }
}

pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Opens and initializes the store, reporting any failure as a
    /// store-initialization error.
    pub fn open_initialized<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let init = || -> Result<Self> {
            let mut db = Self::open(path)?;
            db.initialize()?;
            Ok(db)
        };

        init().map_err(|e| BackstopError::StoreInit {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Database for SqliteDatabase {
    fn initialize(&mut self) -> Result<()> {
        schema::initialize_schema(&self.conn)
    }

    fn get_file_record(&self, path: &str) -> Result<Option<FileRecord>> {
        files::get_file_record(&self.conn, path)
    }

    fn upsert_file_record(&mut self, record: &FileRecord) -> Result<()> {
        files::upsert_file_record(&self.conn, record)
    }

    fn delete_file_record(&mut self, path: &str) -> Result<bool> {
        files::delete_file_record(&self.conn, path)
    }

    fn list_file_records(&self) -> Result<Vec<FileRecord>> {
        files::list_file_records(&self.conn)
    }
}

/// Parses a stored timestamp. RFC 3339 is what this crate writes; naive
/// ISO-8601 values (no offset) are read as local time.
pub(crate) fn parse_timestamp(table: &'static str, value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| BackstopError::corrupt(table, format!("Invalid timestamp '{}': {}", value, e)))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| BackstopError::corrupt(table, format!("Nonexistent local time '{}'", value)))
}
