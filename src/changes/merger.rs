//! Status merge: which file changes of a merge commit are common to all
//! parents.
//!
//! [`CombinedStatusMerger`] mirrors `git log -c`: a path shows up in the
//! combined view only if every parent reports a change for it. For a
//! single-parent commit every status is its own group.

use std::collections::HashMap;

use serde::Serialize;
use weave_git::{ChangeType, FileStatusInfo};

// ---------------------------------------------------------------------------
// MergedStatusInfo
// ---------------------------------------------------------------------------

/// One logical change common to every parent of a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergedStatusInfo {
    status: FileStatusInfo,
    statuses: Vec<FileStatusInfo>,
}

impl MergedStatusInfo {
    /// A group holding a single status from parent 0.
    #[must_use]
    pub fn single(status: FileStatusInfo) -> Self {
        Self {
            statuses: vec![status.clone()],
            status,
        }
    }

    /// The representative status, parsed as the commit-level change.
    #[must_use]
    pub const fn status(&self) -> &FileStatusInfo {
        &self.status
    }

    /// The contributing entries; `statuses()[i]` was reported against parent `i`.
    #[must_use]
    pub fn statuses(&self) -> &[FileStatusInfo] {
        &self.statuses
    }
}

// ---------------------------------------------------------------------------
// StatusMerger
// ---------------------------------------------------------------------------

/// Groups per-parent statuses into changes common to all parents.
///
/// Must be a deterministic function of its input.
pub trait StatusMerger: Send + Sync {
    /// Merge `statuses` (one list per parent).
    fn merge(&self, statuses: &[Vec<FileStatusInfo>]) -> Vec<MergedStatusInfo>;
}

/// The `git log -c` merge.
///
/// - Only paths (post-change path) reported by every parent survive, in the
///   first parent's order. Within one parent, only the first entry for a path
///   counts.
/// - The representative keeps the shared status when all parents agree on the
///   change type (and, for renames, on the source path). Otherwise it is a
///   modification of the path.
#[derive(Clone, Copy, Debug, Default)]
pub struct CombinedStatusMerger;

impl StatusMerger for CombinedStatusMerger {
    fn merge(&self, statuses: &[Vec<FileStatusInfo>]) -> Vec<MergedStatusInfo> {
        let Some((first, rest)) = statuses.split_first() else {
            return Vec::new();
        };

        let mut merged: Vec<MergedStatusInfo> = Vec::with_capacity(first.len());
        let mut by_path: HashMap<&str, usize> = HashMap::with_capacity(first.len());
        for status in first {
            if !by_path.contains_key(status.path.as_str()) {
                by_path.insert(&status.path, merged.len());
                merged.push(MergedStatusInfo::single(status.clone()));
            }
        }

        for (offset, parent_statuses) in rest.iter().enumerate() {
            // Entries carrying a status for every parent before this one.
            let expected = offset + 1;
            for status in parent_statuses {
                let Some(&index) = by_path.get(status.path.as_str()) else {
                    continue;
                };
                let entry = &mut merged[index];
                if entry.statuses.len() == expected {
                    combine(entry, status);
                }
            }
            let complete = expected + 1;
            by_path.retain(|_, &mut index| merged[index].statuses.len() == complete);
        }

        merged.retain(|entry| entry.statuses.len() == statuses.len());
        merged
    }
}

fn combine(entry: &mut MergedStatusInfo, status: &FileStatusInfo) {
    let agrees = match (&entry.status.change_type, &status.change_type) {
        (ChangeType::Renamed { from: ours }, ChangeType::Renamed { from: theirs }) => {
            ours == theirs
        }
        (ours, theirs) => ours.same_kind(theirs),
    };
    if !agrees {
        entry.status = FileStatusInfo::modified(status.path.clone());
    }
    entry.statuses.push(status.clone());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
