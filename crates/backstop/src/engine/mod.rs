pub mod backup;
pub mod copy;

pub use backup::{BackupEngine, BackupSummary, EngineOptions};
pub use copy::{copy_preserving_mtime, remove_empty_dirs, PruneStats};
