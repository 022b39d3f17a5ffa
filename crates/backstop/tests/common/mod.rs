#![allow(dead_code)]

use backstop_lib::{Database, Result, SqliteDatabase};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestFixture {
    pub temp_dir: TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub db: SqliteDatabase,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let source = temp_dir.path().join("source");
        let dest = temp_dir.path().join("backup");
        fs::create_dir_all(&source)?;

        let mut db = SqliteDatabase::open(temp_dir.path().join("test.db"))?;
        db.initialize()?;

        Ok(Self {
            temp_dir,
            source,
            dest,
            db,
        })
    }

    pub fn write_source(&self, rel: &str, size: usize) {
        write_file(&self.source, rel, size);
    }

    pub fn remove_source(&self, rel: &str) {
        fs::remove_file(self.source.join(rel)).unwrap();
    }

    pub fn dest_files(&self) -> Vec<String> {
        list_files(&self.dest)
    }

    pub fn source_files(&self) -> Vec<String> {
        list_files(&self.source)
    }

    pub fn record_paths(&self) -> Vec<String> {
        self.db
            .list_file_records()
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect()
    }
}

pub fn write_file(root: &Path, rel: &str, size: usize) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![b'z'; size]).unwrap();
}

/// Sorted `/`-separated relative paths of every regular file under `root`.
pub fn list_files(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }

    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}
