pub mod scanner;

pub use scanner::{collect_relative_paths, relative_key, FileScanner, ScanOptions, ScanStats, ScannedFile};
