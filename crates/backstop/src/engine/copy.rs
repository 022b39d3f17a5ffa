use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::path::Path;
use walkdir::WalkDir;

/// Copies `source` to `dest`, creating parent directories and carrying the
/// source modification time over to the copy. Returns the bytes copied.
pub fn copy_preserving_mtime(source: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let bytes = fs::copy(source, dest)?;
    let modified = fs::metadata(source)?.modified()?;

    let file = OpenOptions::new().write(true).open(dest)?;
    file.set_modified(modified)?;

    Ok(bytes)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneStats {
    pub dirs_removed: usize,
    pub errors: usize,
}

/// Removes every directory under `root` that is empty once its children have
/// been visited. `root` itself is kept, as is everything at or below
/// `exclude`.
pub fn remove_empty_dirs(root: &Path, exclude: Option<&Path>) -> PruneStats {
    let mut stats = PruneStats::default();

    // `filter_entry` cannot prune here: with `contents_first` a directory's
    // children are yielded before the directory itself reaches the predicate.
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Walk error while pruning {}: {}", root.display(), e);
                stats.errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        if exclude.is_some_and(|excluded| entry.path().starts_with(excluded)) {
            continue;
        }

        let path = entry.path();
        let is_empty = match fs::read_dir(path) {
            Ok(mut children) => children.next().is_none(),
            Err(e) => {
                log::warn!("Failed to list {}: {}", path.display(), e);
                stats.errors += 1;
                continue;
            }
        };

        if !is_empty {
            continue;
        }

        match fs::remove_dir(path) {
            Ok(()) => {
                log::info!("Removed empty directory {}", path.display());
                stats.dirs_removed += 1;
            }
            Err(e) => {
                log::warn!("Failed to remove directory {}: {}", path.display(), e);
                stats.errors += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_parents_and_keeps_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.txt");
        fs::write(&source, b"hello world").unwrap();

        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        OpenOptions::new()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let dest = temp_dir.path().join("out/nested/dst.txt");
        let bytes = copy_preserving_mtime(&source, &dest).unwrap();

        assert_eq!(bytes, 11);
        assert_eq!(fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(fs::metadata(&dest).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn test_copy_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.txt");
        let dest = temp_dir.path().join("b.txt");
        fs::write(&source, b"new contents").unwrap();
        fs::write(&dest, b"old").unwrap();

        copy_preserving_mtime(&source, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new contents");
    }

    #[test]
    fn test_remove_empty_dirs_bottom_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("empty/inner/deepest")).unwrap();
        fs::create_dir_all(root.join("kept/sub")).unwrap();
        fs::write(root.join("kept/sub/file.txt"), b"x").unwrap();
        fs::create_dir_all(root.join("kept/empty_sibling")).unwrap();

        let stats = remove_empty_dirs(root, None);

        assert_eq!(stats.dirs_removed, 4);
        assert_eq!(stats.errors, 0);
        assert!(!root.join("empty").exists());
        assert!(!root.join("kept/empty_sibling").exists());
        assert!(root.join("kept/sub/file.txt").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_remove_empty_dirs_skips_excluded_subtree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested_source/empty_in_source")).unwrap();
        fs::create_dir_all(root.join("stale/empty")).unwrap();

        let excluded = root.join("nested_source");
        let stats = remove_empty_dirs(root, Some(&excluded));

        assert_eq!(stats.dirs_removed, 2);
        assert!(root.join("nested_source/empty_in_source").is_dir());
        assert!(!root.join("stale").exists());
    }
}
