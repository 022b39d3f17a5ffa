use crate::db::parse_timestamp;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

pub const LAST_BACKUP_KEY: &str = "last_backup_date";

/// Global key/value settings.
pub trait SettingsDatabase {
    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&mut self, key: &str, value: &str) -> Result<()>;

    fn last_backup_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.get_setting(LAST_BACKUP_KEY)?
            .map(|value| parse_timestamp("settings", &value))
            .transpose()
    }

    fn set_last_backup_date(&mut self, when: DateTime<Utc>) -> Result<()> {
        self.set_setting(LAST_BACKUP_KEY, &when.to_rfc3339())
    }
}

impl SettingsDatabase for crate::db::SqliteDatabase {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn_mut().execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }
}
