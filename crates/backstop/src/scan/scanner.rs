use crate::error::{BackstopError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::{DirEntry, WalkDir};

/// A regular file found under a scan root.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    /// Store key: path relative to the scan root, `/`-separated.
    pub relative_path: String,
    /// The same relative path as the filesystem sees it. Joins onto another
    /// root go through this, never through the key.
    pub relative: PathBuf,
    pub abs_path: PathBuf,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub mtime: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub dirs_scanned: usize,
    pub bytes_scanned: u64,
    pub special_skipped: usize,
    pub errors: usize,
    /// Relative paths that could not be read. An empty string is the root.
    pub failed_paths: Vec<String>,
}

/// Walk policy shared by every backup mode.
///
/// Entries are visited in file-name order. Symlinks are not followed unless
/// `follow_symlinks` is set; when they are not followed, symlink entries are
/// skipped along with sockets, FIFOs and device nodes. Hidden files are
/// included. `exclude` prunes one subtree from the walk, which keeps a
/// destination nested inside its source out of the source scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub follow_symlinks: bool,
    pub exclude: Option<PathBuf>,
}

/// Lazy recursive walk yielding one [`ScannedFile`] per regular file.
///
/// Entries that fail to stat are logged, counted in [`ScanStats::errors`] and
/// left out of the sequence; the walk keeps going.
pub struct FileScanner {
    root: PathBuf,
    walker: Box<dyn Iterator<Item = walkdir::Result<DirEntry>>>,
    stats: ScanStats,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P, options: &ScanOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(BackstopError::RootNotFound(root));
        }

        let walker = WalkDir::new(&root)
            .follow_links(options.follow_symlinks)
            .sort_by_file_name()
            .into_iter();

        let walker: Box<dyn Iterator<Item = walkdir::Result<DirEntry>>> = match options.exclude.clone() {
            Some(excluded) => Box::new(walker.filter_entry(move |e| e.path() != excluded.as_path())),
            None => Box::new(walker),
        };

        Ok(Self {
            root,
            walker,
            stats: ScanStats::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }

    fn record_failure(&mut self, relative: Option<String>) {
        self.stats.errors += 1;
        if let Some(relative) = relative {
            self.stats.failed_paths.push(relative);
        }
    }

    fn process_entry(&mut self, entry: &DirEntry) -> Result<Option<ScannedFile>> {
        let file_type = entry.file_type();

        if file_type.is_dir() {
            self.stats.dirs_scanned += 1;
            return Ok(None);
        }

        if !file_type.is_file() {
            log::debug!("Skipping non-regular file {}", entry.path().display());
            self.stats.special_skipped += 1;
            return Ok(None);
        }

        let metadata = entry.metadata()?;
        let mtime = match metadata.modified()?.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        };

        let relative = entry
            .path()
            .strip_prefix(&self.root)
            .unwrap_or(entry.path())
            .to_path_buf();
        let relative_path = relative_key(&self.root, entry.path())
            .ok_or_else(|| BackstopError::NonUtf8Path(entry.path().to_path_buf()))?;
        let size = metadata.len();

        self.stats.files_scanned += 1;
        self.stats.bytes_scanned += size;

        Ok(Some(ScannedFile {
            relative_path,
            relative,
            abs_path: entry.path().to_path_buf(),
            size,
            mtime,
        }))
    }
}

impl Iterator for FileScanner {
    type Item = ScannedFile;

    fn next(&mut self) -> Option<ScannedFile> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Walk error under {}: {}", self.root.display(), e);
                    let failed = e.path().map(|p| lossy_key(&self.root, p));
                    self.record_failure(failed);
                    continue;
                }
            };

            match self.process_entry(&entry) {
                Ok(Some(file)) => return Some(file),
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Failed to read {}: {}", entry.path().display(), e);
                    let failed = lossy_key(&self.root, entry.path());
                    self.record_failure(Some(failed));
                }
            }
        }
    }
}

/// Store key for `path` under `root`: components joined with `/`. `None` when
/// a component is not valid UTF-8, since a lossy key could collide with
/// another file's.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join("/"))
}

/// Key used only for reporting failures, where a lossy match is acceptable.
fn lossy_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl ScanStats {
    /// Whether `relative` is, or lies beneath, a path that failed to scan.
    pub fn covers_failure(&self, relative: &str) -> bool {
        self.failed_paths.iter().any(|failed| {
            failed.is_empty()
                || relative == failed
                || relative
                    .strip_prefix(failed.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Every relative file path under `root`. A missing root yields an empty set.
pub fn collect_relative_paths<P: AsRef<Path>>(
    root: P,
    options: &ScanOptions,
) -> (HashSet<String>, ScanStats) {
    match FileScanner::new(root.as_ref(), options) {
        Ok(mut scanner) => {
            let paths = scanner.by_ref().map(|f| f.relative_path).collect();
            (paths, scanner.into_stats())
        }
        Err(e) => {
            log::info!("{}; treating it as empty", e);
            (HashSet::new(), ScanStats::default())
        }
    }
}
