//! Core value types shared across weave crates.
//!
//! These types intentionally contain no process or network handles: they are
//! produced by whatever fetches history (a `git log --name-status` run, a
//! remote API) and consumed by the zipper and the lazy change set.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// A location-independent revision number, displayed as `r<n>`.
///
/// Two change lists fetched from mirrors of the same repository carry the
/// same revision number for the same logical commit, which is what lets the
/// zipper line them up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Create a revision from its number.
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// Return the revision number.
    #[must_use]
    pub const fn number(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RepositoryLocation
// ---------------------------------------------------------------------------

/// A repository or remote that history was fetched from.
///
/// Stored as the presentable string (URL or filesystem path). Two locations
/// are the same location iff their presentable strings are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryLocation(String);

impl RepositoryLocation {
    /// Create a location from its URL or path.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Return the presentable form used for lookups and display.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ChangeType
// ---------------------------------------------------------------------------

/// The kind of change recorded for one file against one parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeType {
    /// File was added.
    Added,
    /// File content or mode was modified.
    Modified,
    /// File was deleted.
    Deleted,
    /// File was renamed (may also be modified).
    Renamed {
        /// The original path before the rename.
        from: String,
    },
}

impl ChangeType {
    /// Returns `true` if both values are the same kind of change, ignoring
    /// rename sources.
    #[must_use]
    pub const fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Added, Self::Added)
                | (Self::Modified, Self::Modified)
                | (Self::Deleted, Self::Deleted)
                | (Self::Renamed { .. }, Self::Renamed { .. })
        )
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "A"),
            Self::Modified => write!(f, "M"),
            Self::Deleted => write!(f, "D"),
            Self::Renamed { .. } => write!(f, "R"),
        }
    }
}

// ---------------------------------------------------------------------------
// FileStatusInfo
// ---------------------------------------------------------------------------

/// One raw reported change for one parent of a commit.
///
/// `path` is the file's path after the change. For deletions that is the
/// deleted path; for renames the source lives in [`ChangeType::Renamed`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileStatusInfo {
    /// Path after the change, relative to the repository root.
    pub path: String,
    /// What happened to the file.
    #[serde(flatten)]
    pub change_type: ChangeType,
}

impl FileStatusInfo {
    /// Create a status entry.
    pub fn new(path: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            path: path.into(),
            change_type,
        }
    }

    /// An added file.
    pub fn added(path: impl Into<String>) -> Self {
        Self::new(path, ChangeType::Added)
    }

    /// A modified file.
    pub fn modified(path: impl Into<String>) -> Self {
        Self::new(path, ChangeType::Modified)
    }

    /// A deleted file.
    pub fn deleted(path: impl Into<String>) -> Self {
        Self::new(path, ChangeType::Deleted)
    }

    /// A file renamed from `from` to `to`.
    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(to, ChangeType::Renamed { from: from.into() })
    }

    /// Path before the change: the rename source, or `path` otherwise.
    #[must_use]
    pub fn first_path(&self) -> &str {
        match &self.change_type {
            ChangeType::Renamed { from } => from,
            _ => &self.path,
        }
    }
}

impl fmt::Display for FileStatusInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change_type {
            ChangeType::Renamed { from } => write!(f, "R {from} -> {}", self.path),
            other => write!(f, "{other} {}", self.path),
        }
    }
}

// ---------------------------------------------------------------------------
// PathChange
// ---------------------------------------------------------------------------

/// A parsed change: the file's path on each side of one parent edge.
///
/// `before` is `None` for additions, `after` is `None` for deletions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathChange {
    /// Path in the parent revision.
    pub before: Option<String>,
    /// Path in the commit itself.
    pub after: Option<String>,
    /// Index of the parent this change was computed against.
    pub parent: usize,
}

impl PathChange {
    /// Build the change described by `status` against parent `parent`.
    #[must_use]
    pub fn from_status(status: &FileStatusInfo, parent: usize) -> Self {
        let before = match status.change_type {
            ChangeType::Added => None,
            _ => Some(status.first_path().to_owned()),
        };
        let after = match status.change_type {
            ChangeType::Deleted => None,
            _ => Some(status.path.clone()),
        };
        Self {
            before,
            after,
            parent,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
