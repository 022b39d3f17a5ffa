//! Decides whether a scanned source file has to be copied during a smart run.
//!
//! Detection is by size only: the stored modification time is never
//! compared, so an edit that keeps the file length unchanged goes unnoticed
//! until the backup copy disappears or a full run is made.

use crate::db::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDecision {
    /// No record exists for the path.
    New,
    /// Size differs from the recorded size.
    SizeChanged { recorded: i64, current: i64 },
    /// Record matches but the copy under the backup tree is gone.
    MissingFromBackup,
    Unchanged,
}

impl CopyDecision {
    pub fn needs_copy(&self) -> bool {
        !matches!(self, CopyDecision::Unchanged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CopyDecision::New => "new",
            CopyDecision::SizeChanged { .. } => "size changed",
            CopyDecision::MissingFromBackup => "missing from backup",
            CopyDecision::Unchanged => "unchanged",
        }
    }
}

/// First matching rule wins: new, then size change, then missing copy.
pub fn classify(size: u64, prior: Option<&FileRecord>, destination_exists: bool) -> CopyDecision {
    let Some(record) = prior else {
        return CopyDecision::New;
    };

    let current = size as i64;
    if record.size_bytes != current {
        return CopyDecision::SizeChanged {
            recorded: record.size_bytes,
            current,
        };
    }

    if !destination_exists {
        return CopyDecision::MissingFromBackup;
    }

    CopyDecision::Unchanged
}

pub fn needs_copy(
    path: &str,
    size: u64,
    prior: Option<&FileRecord>,
    destination_exists: bool,
) -> bool {
    let decision = classify(size, prior, destination_exists);
    log::debug!("{}: {}", path, decision.as_str());
    decision.needs_copy()
}
