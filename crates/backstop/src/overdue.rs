use crate::db::{HistoryDatabase, SettingsDatabase};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const DEFAULT_ALERT_THRESHOLD_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OverdueStatus {
    Fresh {
        last_backup: DateTime<Utc>,
        days_since: i64,
    },
    Overdue {
        last_backup: DateTime<Utc>,
        days_since: i64,
    },
    NoHistory,
}

impl OverdueStatus {
    pub fn is_overdue(&self) -> bool {
        matches!(self, OverdueStatus::Overdue { .. })
    }

    pub fn last_backup(&self) -> Option<DateTime<Utc>> {
        match self {
            OverdueStatus::Fresh { last_backup, .. } | OverdueStatus::Overdue { last_backup, .. } => {
                Some(*last_backup)
            }
            OverdueStatus::NoHistory => None,
        }
    }

    pub fn days_since(&self) -> Option<i64> {
        match self {
            OverdueStatus::Fresh { days_since, .. } | OverdueStatus::Overdue { days_since, .. } => {
                Some(*days_since)
            }
            OverdueStatus::NoHistory => None,
        }
    }

    /// Date by which the next backup should run.
    pub fn next_due(&self, threshold_days: i64) -> Option<DateTime<Utc>> {
        self.last_backup()
            .map(|last| last + Duration::days(threshold_days))
    }
}

/// The `last_backup_date` setting, or failing that the newest history entry
/// of any type.
pub fn last_backup_timestamp<D: HistoryDatabase + SettingsDatabase>(
    db: &D,
) -> Result<Option<DateTime<Utc>>> {
    if let Some(last) = db.last_backup_date()? {
        return Ok(Some(last));
    }

    Ok(db.latest_history()?.map(|entry| entry.timestamp))
}

pub fn check_overdue<D: HistoryDatabase + SettingsDatabase>(db: &D, threshold_days: i64) -> OverdueStatus {
    check_overdue_at(db, threshold_days, Utc::now())
}

/// Read failures are logged and reported as [`OverdueStatus::NoHistory`].
pub fn check_overdue_at<D: HistoryDatabase + SettingsDatabase>(
    db: &D,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> OverdueStatus {
    match last_backup_timestamp(db) {
        Ok(Some(last)) => classify_age(last, now, threshold_days),
        Ok(None) => {
            log::warn!("No backup history found");
            OverdueStatus::NoHistory
        }
        Err(e) => {
            log::error!("Failed to read last backup date: {}", e);
            OverdueStatus::NoHistory
        }
    }
}

/// Whole days elapsed, truncated. Overdue only when strictly above the
/// threshold. A timestamp in the future counts as zero days.
pub fn classify_age(last_backup: DateTime<Utc>, now: DateTime<Utc>, threshold_days: i64) -> OverdueStatus {
    let days_since = (now - last_backup).num_days().max(0);

    if days_since > threshold_days {
        OverdueStatus::Overdue {
            last_backup,
            days_since,
        }
    } else {
        OverdueStatus::Fresh {
            last_backup,
            days_since,
        }
    }
}
