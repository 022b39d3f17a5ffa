use crate::classify::classify;
use crate::db::{BackupHistoryEntry, BackupType, Database, FileRecord, HistoryDatabase, SettingsDatabase};
use crate::engine::copy::{copy_preserving_mtime, remove_empty_dirs};
use crate::error::{BackstopError, Result};
use crate::scan::{collect_relative_paths, FileScanner, ScanOptions, ScannedFile};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Walk and classify only: no copies, deletions, record writes or
    /// history entries.
    pub dry_run: bool,
    pub follow_symlinks: bool,
}

/// Outcome of one backup run. Counters a mode does not use stay at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupSummary {
    pub backup_type: BackupType,
    pub copied: usize,
    pub skipped: usize,
    pub removed: usize,
    pub dirs_removed: usize,
    pub errors: usize,
    pub bytes_copied: u64,
    pub dry_run: bool,
    pub history_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BackupSummary {
    fn new(backup_type: BackupType, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            backup_type,
            copied: 0,
            skipped: 0,
            removed: 0,
            dirs_removed: 0,
            errors: 0,
            bytes_copied: 0,
            dry_run,
            history_id: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// Files this run counts as processed in its history entry.
    pub fn file_count(&self) -> usize {
        match self.backup_type {
            BackupType::Full | BackupType::Smart => self.copied,
            BackupType::Clean => self.removed,
        }
    }
}

pub struct BackupEngine<'a, D: Database + HistoryDatabase + SettingsDatabase> {
    db: &'a mut D,
    options: EngineOptions,
    progress: Option<ProgressBar>,
}

impl<'a, D: Database + HistoryDatabase + SettingsDatabase> BackupEngine<'a, D> {
    pub fn new(db: &'a mut D, options: EngineOptions) -> Self {
        Self {
            db,
            options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Copies every source file unconditionally.
    pub fn run_full(&mut self, source: &Path, dest: &Path) -> Result<BackupSummary> {
        let scan_options = self.prepare_backup(source, dest)?;
        let mut summary = BackupSummary::new(BackupType::Full, self.options.dry_run);
        log::info!("Starting full backup {} -> {}", source.display(), dest.display());

        let mut scanner = FileScanner::new(source, &scan_options)?;
        for file in scanner.by_ref() {
            self.tick(&file.relative_path);
            self.copy_and_record(&file, dest, &mut summary);
        }
        summary.errors += scanner.stats().errors;

        self.finish(&mut summary, source, dest);
        Ok(summary)
    }

    /// Copies only files the classifier flags as new, resized or missing
    /// from the backup tree.
    pub fn run_smart(&mut self, source: &Path, dest: &Path) -> Result<BackupSummary> {
        let scan_options = self.prepare_backup(source, dest)?;
        let mut summary = BackupSummary::new(BackupType::Smart, self.options.dry_run);
        log::info!("Starting smart backup {} -> {}", source.display(), dest.display());

        let records = self.db.file_record_map().unwrap_or_else(|e| {
            log::error!("Failed to load file records, treating every file as new: {}", e);
            HashMap::new()
        });

        let mut scanner = FileScanner::new(source, &scan_options)?;
        for file in scanner.by_ref() {
            self.tick(&file.relative_path);

            let dest_path = dest.join(&file.relative);
            let decision = classify(file.size, records.get(&file.relative_path), dest_path.exists());
            log::debug!("{}: {}", file.relative_path, decision.as_str());

            if decision.needs_copy() {
                self.copy_and_record(&file, dest, &mut summary);
            } else {
                summary.skipped += 1;
            }
        }
        summary.errors += scanner.stats().errors;

        self.finish(&mut summary, source, dest);
        Ok(summary)
    }

    /// Deletes destination files whose relative path no longer exists under
    /// the source, drops their records, then prunes emptied directories.
    ///
    /// An absent source leaves every destination file orphaned. Files lying
    /// under a source path that could not be read are kept.
    pub fn run_clean(&mut self, source: &Path, dest: &Path) -> Result<BackupSummary> {
        if !dest.is_dir() {
            return Err(BackstopError::DestinationNotFound(dest.to_path_buf()));
        }
        ensure_distinct(source, dest)?;

        let mut summary = BackupSummary::new(BackupType::Clean, self.options.dry_run);
        log::info!("Starting clean of {} against {}", dest.display(), source.display());

        let (source_paths, source_stats) =
            collect_relative_paths(source, &self.scan_options(source, dest));
        summary.errors += source_stats.errors;

        let dest_options = self.scan_options(dest, source);
        if let Some(excluded) = &dest_options.exclude {
            log::info!("Leaving nested source {} untouched", excluded.display());
        }
        let mut scanner = FileScanner::new(dest, &dest_options)?;
        for file in scanner.by_ref() {
            self.tick(&file.relative_path);

            if source_paths.contains(&file.relative_path) {
                continue;
            }
            if source_stats.covers_failure(&file.relative_path) {
                log::warn!(
                    "Keeping {}: its source location could not be read",
                    file.relative_path
                );
                continue;
            }

            match self.remove_orphan(&file) {
                Ok(()) => summary.removed += 1,
                Err(e) => {
                    log::warn!("Failed to remove {}: {}", file.abs_path.display(), e);
                    summary.errors += 1;
                }
            }
        }
        summary.errors += scanner.stats().errors;

        if !self.options.dry_run {
            let pruned = remove_empty_dirs(dest, dest_options.exclude.as_deref());
            summary.dirs_removed = pruned.dirs_removed;
            summary.errors += pruned.errors;
        }

        self.finish(&mut summary, source, dest);
        Ok(summary)
    }

    fn prepare_backup(&self, source: &Path, dest: &Path) -> Result<ScanOptions> {
        if !source.is_dir() {
            return Err(BackstopError::SourceNotFound(source.to_path_buf()));
        }
        ensure_distinct(source, dest)?;

        if !self.options.dry_run {
            fs::create_dir_all(dest)?;
        }

        Ok(self.scan_options(source, dest))
    }

    /// Scan options for walking `root`, pruning `other` when it is nested
    /// inside it. Nesting is decided on resolved paths, so symlinks, `..`
    /// and relative spellings are caught; the excluded path is re-expressed
    /// under `root` as given, which is how the walk reports entries.
    fn scan_options(&self, root: &Path, other: &Path) -> ScanOptions {
        let resolved_root = resolve_path(root);
        let resolved_other = resolve_path(other);
        let exclude = resolved_other
            .strip_prefix(&resolved_root)
            .ok()
            .filter(|rest| !rest.as_os_str().is_empty())
            .map(|rest| root.join(rest));
        ScanOptions {
            follow_symlinks: self.options.follow_symlinks,
            exclude,
        }
    }

    fn copy_and_record(&mut self, file: &ScannedFile, dest: &Path, summary: &mut BackupSummary) {
        if self.options.dry_run {
            log::info!("DRY RUN: Would copy {}", file.relative_path);
            summary.copied += 1;
            summary.bytes_copied += file.size;
            return;
        }

        let dest_path = dest.join(&file.relative);
        let result = copy_preserving_mtime(&file.abs_path, &dest_path).and_then(|bytes| {
            self.db.upsert_file_record(&FileRecord {
                path: file.relative_path.clone(),
                size_bytes: file.size as i64,
                mtime: file.mtime,
                last_backup: summary.started_at,
            })?;
            Ok(bytes)
        });

        match result {
            Ok(bytes) => {
                summary.copied += 1;
                summary.bytes_copied += bytes;
            }
            Err(e) => {
                log::warn!("Failed to back up {}: {}", file.abs_path.display(), e);
                summary.errors += 1;
            }
        }
    }

    fn remove_orphan(&mut self, file: &ScannedFile) -> Result<()> {
        if self.options.dry_run {
            log::info!("DRY RUN: Would remove {}", file.relative_path);
            return Ok(());
        }

        fs::remove_file(&file.abs_path)?;
        self.db.delete_file_record(&file.relative_path)?;
        log::info!("Removed orphan {}", file.relative_path);
        Ok(())
    }

    /// Appends the history entry and, for data backups, moves the
    /// last-backup timestamp forward. Store failures here are counted, not
    /// propagated.
    fn finish(&mut self, summary: &mut BackupSummary, source: &Path, dest: &Path) {
        summary.finished_at = Utc::now();
        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        if self.options.dry_run {
            return;
        }

        let entry = BackupHistoryEntry {
            id: 0,
            backup_type: summary.backup_type,
            timestamp: summary.finished_at,
            file_count: summary.file_count() as i64,
            source_path: Some(source.display().to_string()),
            backup_path: Some(dest.display().to_string()),
        };

        match self.db.append_history(&entry) {
            Ok(id) => summary.history_id = Some(id),
            Err(e) => {
                log::error!("Failed to record {} backup in history: {}", summary.backup_type, e);
                summary.errors += 1;
            }
        }

        if summary.backup_type.updates_last_backup() {
            if let Err(e) = self.db.set_last_backup_date(summary.finished_at) {
                log::error!("Failed to update last backup date: {}", e);
                summary.errors += 1;
            }
        }

        log::info!(
            "{} backup finished: {} copied, {} skipped, {} removed, {} errors",
            summary.backup_type,
            summary.copied,
            summary.skipped,
            summary.removed,
            summary.errors
        );
    }

    fn tick(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress.set_message(message.to_string());
            progress.inc(1);
        }
    }
}

/// Canonical form of `path`. When it does not exist yet, the nearest existing
/// ancestor is canonicalized and the missing tail appended.
fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => return path.to_path_buf(),
        }
    };

    let mut tail = Vec::new();
    let mut current = absolute.as_path();
    loop {
        if let Ok(resolved) = fs::canonicalize(current) {
            return tail.iter().rev().fold(resolved, |acc, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                current = parent;
            }
            _ => return absolute,
        }
    }
}

fn ensure_distinct(source: &Path, dest: &Path) -> Result<()> {
    if resolve_path(source) == resolve_path(dest) {
        return Err(BackstopError::Config(format!(
            "Source and destination are the same directory: {}",
            source.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteDatabase;
    use tempfile::TempDir;

    fn create_test_db() -> SqliteDatabase {
        let mut db = SqliteDatabase::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn write(root: &Path, rel: &str, size: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; size]).unwrap();
    }

    #[test]
    fn test_full_copies_everything() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dst");
        write(&source, "a.txt", 100);
        write(&source, "nested/b.txt", 50);

        let mut db = create_test_db();
        let summary = BackupEngine::new(&mut db, EngineOptions::default())
            .run_full(&source, &dest)
            .unwrap();

        assert_eq!(summary.copied, 2);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.bytes_copied, 150);
        assert!(summary.history_id.is_some());
        assert_eq!(fs::read(dest.join("nested/b.txt")).unwrap().len(), 50);

        assert_eq!(db.list_file_records().unwrap().len(), 2);
        assert!(db.last_backup_date().unwrap().is_some());
    }

    #[test]
    fn test_full_missing_source_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = create_test_db();

        let result = BackupEngine::new(&mut db, EngineOptions::default())
            .run_full(&temp_dir.path().join("missing"), &temp_dir.path().join("dst"));

        assert!(matches!(result, Err(BackstopError::SourceNotFound(_))));
        assert_eq!(db.count_history().unwrap(), 0);
        assert!(!temp_dir.path().join("dst").exists());
    }

    #[test]
    fn test_same_source_and_destination_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = create_test_db();

        let result = BackupEngine::new(&mut db, EngineOptions::default())
            .run_smart(temp_dir.path(), temp_dir.path());
        assert!(matches!(result, Err(BackstopError::Config(_))));
    }

    #[test]
    fn test_resolve_path_for_missing_tail() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        let canonical = fs::canonicalize(temp_dir.path()).unwrap();

        let dotted = temp_dir.path().join("sub/../later/deeper");
        assert_eq!(resolve_path(&dotted), canonical.join("later/deeper"));
        assert_eq!(resolve_path(&temp_dir.path().join("sub")), canonical.join("sub"));
    }

    #[test]
    fn test_smart_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dst");
        write(&source, "a.txt", 10);
        write(&source, "b.txt", 20);

        let mut db = create_test_db();
        let first = BackupEngine::new(&mut db, EngineOptions::default())
            .run_smart(&source, &dest)
            .unwrap();
        assert_eq!(first.copied, 2);

        let second = BackupEngine::new(&mut db, EngineOptions::default())
            .run_smart(&source, &dest)
            .unwrap();
        assert_eq!(second.copied, 0);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn test_smart_recopies_missing_backup() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dst");
        write(&source, "a.txt", 10);

        let mut db = create_test_db();
        BackupEngine::new(&mut db, EngineOptions::default())
            .run_smart(&source, &dest)
            .unwrap();
        fs::remove_file(dest.join("a.txt")).unwrap();

        let summary = BackupEngine::new(&mut db, EngineOptions::default())
            .run_smart(&source, &dest)
            .unwrap();
        assert_eq!(summary.copied, 1);
        assert!(dest.join("a.txt").exists());
    }

    #[test]
    fn test_nested_destination_is_not_backed_up_into_itself() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().to_path_buf();
        let dest = source.join("backup");
        write(&source, "a.txt", 5);

        let mut db = create_test_db();
        let first = BackupEngine::new(&mut db, EngineOptions::default())
            .run_full(&source, &dest)
            .unwrap();
        let second = BackupEngine::new(&mut db, EngineOptions::default())
            .run_full(&source, &dest)
            .unwrap();

        assert_eq!(first.copied, 1);
        assert_eq!(second.copied, 1);
        assert!(!dest.join("backup").exists());
    }

    #[test]
    fn test_clean_does_not_touch_last_backup_date() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dst");
        write(&dest, "orphan.txt", 3);
        fs::create_dir_all(&source).unwrap();

        let mut db = create_test_db();
        let summary = BackupEngine::new(&mut db, EngineOptions::default())
            .run_clean(&source, &dest)
            .unwrap();

        assert_eq!(summary.removed, 1);
        assert!(!dest.join("orphan.txt").exists());
        assert!(db.last_backup_date().unwrap().is_none());

        let history = db.list_history(None).unwrap();
        assert_eq!(history[0].backup_type, BackupType::Clean);
        assert_eq!(history[0].file_count, 1);
    }

    #[test]
    fn test_clean_missing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = create_test_db();

        let result = BackupEngine::new(&mut db, EngineOptions::default())
            .run_clean(temp_dir.path(), &temp_dir.path().join("nope"));
        assert!(matches!(result, Err(BackstopError::DestinationNotFound(_))));
    }

    #[test]
    fn test_clean_with_absent_source_orphans_everything() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dst");
        write(&dest, "one.txt", 1);
        write(&dest, "dir/two.txt", 2);

        let mut db = create_test_db();
        let summary = BackupEngine::new(&mut db, EngineOptions::default())
            .run_clean(&temp_dir.path().join("gone"), &dest)
            .unwrap();

        assert_eq!(summary.removed, 2);
        assert_eq!(summary.dirs_removed, 1);
        assert!(dest.exists());
        assert!(!dest.join("dir").exists());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dst");
        write(&source, "a.txt", 10);

        let mut db = create_test_db();
        let options = EngineOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = BackupEngine::new(&mut db, options)
            .run_full(&source, &dest)
            .unwrap();

        assert_eq!(summary.copied, 1);
        assert!(summary.dry_run);
        assert!(summary.history_id.is_none());
        assert!(!dest.exists());
        assert!(db.list_file_records().unwrap().is_empty());
        assert_eq!(db.count_history().unwrap(), 0);
    }
}
