pub mod classify;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod overdue;
pub mod scan;
pub mod util;

pub use classify::{classify, needs_copy, CopyDecision};
pub use config::{Config, Settings};
pub use db::{
    BackupHistoryEntry, BackupType, Database, FileRecord, HistoryDatabase, SettingsDatabase,
    SqliteDatabase,
};
pub use engine::{BackupEngine, BackupSummary, EngineOptions};
pub use error::{BackstopError, Result};
pub use overdue::{check_overdue, check_overdue_at, OverdueStatus, DEFAULT_ALERT_THRESHOLD_DAYS};
pub use scan::{FileScanner, ScanOptions, ScanStats, ScannedFile};
