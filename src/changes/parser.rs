//! The parse seam between raw statuses and change values.

use weave_git::{FileStatusInfo, PathChange};

/// Turns raw status entries into change values.
///
/// Implementations must return exactly one change per input status, in the
/// same order. [`LazyChangeSet`](super::LazyChangeSet) treats anything else
/// as a broken parser and reports it.
///
/// Parsing may run more than once for the same input when threads race on a
/// first access, so it must not have side effects that matter.
pub trait ChangesParser: Send + Sync {
    /// The parsed change type.
    type Change;

    /// Parse `statuses`, all reported against parent number `parent`.
    fn parse_status_info(&self, statuses: &[FileStatusInfo], parent: usize) -> Vec<Self::Change>;
}

/// Parses statuses into [`PathChange`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathChangeParser;

impl ChangesParser for PathChangeParser {
    type Change = PathChange;

    fn parse_status_info(&self, statuses: &[FileStatusInfo], parent: usize) -> Vec<PathChange> {
        statuses
            .iter()
            .map(|status| PathChange::from_status(status, parent))
            .collect()
    }
}
