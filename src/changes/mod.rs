//! Lazily parsed commit change sets.
//!
//! Parsing a commit's raw statuses into change values can be costly, and a
//! log holds many commits whose changes are never looked at. A
//! [`LazyChangeSet`] keeps the raw per-parent statuses and parses them on
//! first access.
//!
//! # States
//!
//! A change set is in one of three states and only ever moves forward:
//!
//! - **Empty**: no parent reported any change.
//! - **Unparsed**: raw statuses held, nothing parsed yet.
//! - **Parsed**: merged and per-parent collections cached; terminal.
//!
//! # Concurrency
//!
//! Nothing blocks while parsing. Threads racing on the first access may each
//! parse, then publish through a [`OnceLock`]; the first result published is
//! kept and every other one is dropped. All callers, including the losers,
//! get the published collections. Once published, the raw statuses are
//! released; only their count is kept for [`LazyChangeSet::size`].

pub mod merger;
pub mod parser;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use thiserror::Error;
use tracing::{debug, error};
use weave_git::FileStatusInfo;

pub use merger::{CombinedStatusMerger, MergedStatusInfo, StatusMerger};
pub use parser::{ChangesParser, PathChangeParser};

/// A shared, immutable collection of parsed changes.
pub type Changes<C> = Arc<[CommitChange<C>]>;

// ---------------------------------------------------------------------------
// ChangesError
// ---------------------------------------------------------------------------

/// Which parse produced a count mismatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseScope {
    /// The commit-level parse of merged statuses.
    Merged,
    /// The parse of one parent's raw statuses.
    Parent(usize),
}

impl fmt::Display for ParseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merged => write!(f, "merged changes"),
            Self::Parent(parent) => write!(f, "changes to parent {parent}"),
        }
    }
}

/// Errors returned when reading a [`LazyChangeSet`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangesError {
    /// A parent index past the commit's parent count.
    #[error("parent index {parent} out of range for a commit with {parents} parent(s)")]
    ParentOutOfRange {
        /// The requested index.
        parent: usize,
        /// How many parents the commit has.
        parents: usize,
    },

    /// The parser broke its one-change-per-status contract.
    #[error("incorrectly parsed {scope}: {statuses} status(es) became {changes} change(s)")]
    ParseCountMismatch {
        /// Which parse went wrong.
        scope: ParseScope,
        /// Statuses handed to the parser.
        statuses: usize,
        /// Changes it returned.
        changes: usize,
    },
}

// ---------------------------------------------------------------------------
// CommitChange / MergedChange
// ---------------------------------------------------------------------------

/// One entry of a parsed collection.
#[derive(Debug, PartialEq, Eq)]
pub enum CommitChange<C> {
    /// A change against a single parent.
    Plain(C),
    /// A change common to all parents of a merge commit.
    Merged(MergedChange<C>),
}

impl<C> CommitChange<C> {
    /// The parsed change.
    #[must_use]
    pub const fn change(&self) -> &C {
        match self {
            Self::Plain(change) => change,
            Self::Merged(merged) => &merged.change,
        }
    }

    /// The merge-commit view, if this entry has one.
    #[must_use]
    pub const fn as_merged(&self) -> Option<&MergedChange<C>> {
        match self {
            Self::Plain(_) => None,
            Self::Merged(merged) => Some(merged),
        }
    }
}

/// A merge-commit change that knows which statuses each parent contributed.
///
/// The per-parent [`source_changes`](Self::source_changes) are parsed on
/// first request and cached on this value, independently of the change set
/// that produced it.
pub struct MergedChange<C> {
    change: C,
    status: MergedStatusInfo,
    parser: Arc<dyn ChangesParser<Change = C>>,
    sources: OnceLock<Vec<C>>,
}

impl<C> MergedChange<C> {
    fn new(
        change: C,
        status: MergedStatusInfo,
        parser: Arc<dyn ChangesParser<Change = C>>,
    ) -> Self {
        Self {
            change,
            status,
            parser,
            sources: OnceLock::new(),
        }
    }

    /// The commit-level change.
    #[must_use]
    pub const fn change(&self) -> &C {
        &self.change
    }

    /// The statuses this change was merged from.
    #[must_use]
    pub const fn status_info(&self) -> &MergedStatusInfo {
        &self.status
    }

    /// The change as seen from each parent, in parent order.
    pub fn source_changes(&self) -> &[C] {
        if let Some(sources) = self.sources.get() {
            return sources;
        }
        let statuses = self.status.statuses();
        let mut computed = Vec::with_capacity(statuses.len());
        for (parent, status) in statuses.iter().enumerate() {
            let changes = self
                .parser
                .parse_status_info(std::slice::from_ref(status), parent);
            if changes.len() != 1 {
                error!(
                    scope = %ParseScope::Parent(parent),
                    changes = changes.len(),
                    "parser broke the one-change-per-status contract for a source change"
                );
            }
            computed.extend(changes);
        }
        self.sources.get_or_init(|| computed)
    }
}

impl<C: fmt::Debug> fmt::Debug for MergedChange<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedChange")
            .field("change", &self.change)
            .field("status", &self.status)
            .field("sources", &self.sources.get())
            .finish_non_exhaustive()
    }
}

// Equality is about the change, not about what has been cached so far.
impl<C: PartialEq> PartialEq for MergedChange<C> {
    fn eq(&self, other: &Self) -> bool {
        self.change == other.change && self.status == other.status
    }
}

impl<C: Eq> Eq for MergedChange<C> {}

// ---------------------------------------------------------------------------
// LazyChangeSet
// ---------------------------------------------------------------------------

/// The file changes of one commit, parsed on first access.
///
/// ```rust,ignore
/// let set = LazyChangeSet::new(vec![first_parent, second_parent], Arc::new(PathChangeParser));
/// assert_eq!(set.size(), first_parent_len + second_parent_len); // no parsing
/// let combined = set.merged_changes()?; // parses once
/// ```
pub struct LazyChangeSet<C> {
    parents: usize,
    size: usize,
    // Handed out to parsing threads and released once `parsed` is published.
    unparsed: Mutex<Option<Arc<UnparsedChanges<C>>>>,
    parsed: OnceLock<ParsedChanges<C>>,
}

struct UnparsedChanges<C> {
    statuses: Vec<Vec<FileStatusInfo>>,
    parser: Arc<dyn ChangesParser<Change = C>>,
    merger: Arc<dyn StatusMerger>,
}

struct ParsedChanges<C> {
    merged: Changes<C>,
    per_parent: Vec<Changes<C>>,
}

/// Snapshot of a change set's state, matched wherever it is read.
enum ChangesState<'a, C> {
    Empty,
    Unparsed(Arc<UnparsedChanges<C>>),
    Parsed(&'a ParsedChanges<C>),
}

impl<C> LazyChangeSet<C> {
    /// Wrap the raw statuses of a commit, one list per parent.
    ///
    /// Uses [`CombinedStatusMerger`] for the merged view.
    #[must_use]
    pub fn new(
        statuses: Vec<Vec<FileStatusInfo>>,
        parser: Arc<dyn ChangesParser<Change = C>>,
    ) -> Self {
        let parents = statuses.len();
        let size = statuses.iter().map(Vec::len).sum();
        let unparsed = (size > 0).then(|| {
            Arc::new(UnparsedChanges {
                statuses,
                parser,
                merger: Arc::new(CombinedStatusMerger),
            })
        });
        Self {
            parents,
            size,
            unparsed: Mutex::new(unparsed),
            parsed: OnceLock::new(),
        }
    }

    /// Replace the status merger used for the merged view.
    #[must_use]
    pub fn with_status_merger(mut self, merger: Arc<dyn StatusMerger>) -> Self {
        let slot = self
            .unparsed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(unparsed) = slot.as_mut().and_then(Arc::get_mut) {
            unparsed.merger = merger;
        }
        self
    }

    /// Number of parents the statuses were reported against.
    #[must_use]
    pub const fn parent_count(&self) -> usize {
        self.parents
    }

    /// Total raw statuses across all parents. Never triggers parsing.
    ///
    /// For a merge commit this is usually more than the number of merged
    /// changes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Whether the parsed collections have been published.
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }

    /// The commit-level changes: for a merge commit, the changes common to
    /// all parents.
    ///
    /// # Errors
    /// Returns [`ChangesError::ParseCountMismatch`] if the parser does not
    /// return one change per status.
    pub fn merged_changes(&self) -> Result<Changes<C>, ChangesError> {
        match self.state() {
            ChangesState::Empty => Ok(Vec::new().into()),
            ChangesState::Unparsed(unparsed) => {
                Ok(Arc::clone(&self.materialize(&unparsed)?.merged))
            }
            ChangesState::Parsed(parsed) => Ok(Arc::clone(&parsed.merged)),
        }
    }

    /// The changes against parent number `parent`.
    ///
    /// # Errors
    /// Returns [`ChangesError::ParentOutOfRange`] for a bad index and
    /// [`ChangesError::ParseCountMismatch`] for a broken parser.
    pub fn changes(&self, parent: usize) -> Result<Changes<C>, ChangesError> {
        if parent >= self.parents {
            return Err(ChangesError::ParentOutOfRange {
                parent,
                parents: self.parents,
            });
        }
        match self.state() {
            ChangesState::Empty => Ok(Vec::new().into()),
            ChangesState::Unparsed(unparsed) => self.materialize(&unparsed)?.changes(parent),
            ChangesState::Parsed(parsed) => parsed.changes(parent),
        }
    }

    fn state(&self) -> ChangesState<'_, C> {
        if self.size == 0 {
            return ChangesState::Empty;
        }
        if let Some(parsed) = self.parsed.get() {
            return ChangesState::Parsed(parsed);
        }
        let unparsed = self.unparsed_slot().clone();
        match unparsed {
            Some(unparsed) => ChangesState::Unparsed(unparsed),
            // Released by a thread that published in the meantime.
            None => self.parsed.get().map_or(ChangesState::Empty, ChangesState::Parsed),
        }
    }

    /// The raw statuses. The lock is only held to clone or drop the `Arc`.
    fn unparsed_slot(&self) -> MutexGuard<'_, Option<Arc<UnparsedChanges<C>>>> {
        self.unparsed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse, then publish unless another thread already did.
    fn materialize(
        &self,
        unparsed: &UnparsedChanges<C>,
    ) -> Result<&ParsedChanges<C>, ChangesError> {
        let parsed = unparsed.parse()?;
        let mut published = false;
        let installed = self.parsed.get_or_init(|| {
            published = true;
            parsed
        });
        if published {
            self.unparsed_slot().take();
        } else {
            debug!("discarding changes parsed by a losing thread");
        }
        Ok(installed)
    }
}

impl<C> fmt::Debug for LazyChangeSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyChangeSet")
            .field("parents", &self.parents)
            .field("size", &self.size())
            .field("parsed", &self.is_parsed())
            .finish()
    }
}

impl<C> UnparsedChanges<C> {
    fn parse(&self) -> Result<ParsedChanges<C>, ChangesError> {
        let merged = self.parse_merged_changes()?;
        let per_parent = self.compute_changes(&merged)?;
        Ok(ParsedChanges { merged, per_parent })
    }

    fn parse_merged_changes(&self) -> Result<Changes<C>, ChangesError> {
        let statuses = self.merger.merge(&self.statuses);
        let representatives: Vec<FileStatusInfo> =
            statuses.iter().map(|s| s.status().clone()).collect();
        let changes = self.parser.parse_status_info(&representatives, 0);
        check_count(ParseScope::Merged, statuses.len(), changes.len())?;

        if self.statuses.len() <= 1 {
            return Ok(changes.into_iter().map(CommitChange::Plain).collect());
        }
        Ok(changes
            .into_iter()
            .zip(statuses)
            .map(|(change, status)| {
                CommitChange::Merged(MergedChange::new(change, status, Arc::clone(&self.parser)))
            })
            .collect())
    }

    fn compute_changes(&self, merged: &Changes<C>) -> Result<Vec<Changes<C>>, ChangesError> {
        if self.statuses.len() == 1 {
            return Ok(vec![Arc::clone(merged)]);
        }
        self.statuses
            .iter()
            .enumerate()
            .map(|(parent, statuses)| -> Result<Changes<C>, ChangesError> {
                let changes = self.parser.parse_status_info(statuses, parent);
                check_count(ParseScope::Parent(parent), statuses.len(), changes.len())?;
                Ok(changes.into_iter().map(CommitChange::Plain).collect())
            })
            .collect()
    }
}

impl<C> ParsedChanges<C> {
    fn changes(&self, parent: usize) -> Result<Changes<C>, ChangesError> {
        self.per_parent
            .get(parent)
            .map(Arc::clone)
            .ok_or(ChangesError::ParentOutOfRange {
                parent,
                parents: self.per_parent.len(),
            })
    }
}

fn check_count(scope: ParseScope, statuses: usize, changes: usize) -> Result<(), ChangesError> {
    if statuses == changes {
        return Ok(());
    }
    error!(%scope, statuses, changes, "parser broke the one-change-per-status contract");
    Err(ChangesError::ParseCountMismatch {
        scope,
        statuses,
        changes,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
