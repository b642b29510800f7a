//! Sequence zipper: merge per-location record sequences into one history.
//!
//! Each location contributes a sequence of records (one per commit it saw).
//! Locations that mirror each other are grouped by a [`GroupingPolicy`]; inside
//! a group the sequences are k-way merged by key and records that share a key
//! are zipped into one record by the [`ListsZipper`] strategy.
//!
//! # Output order
//!
//! 1. Records of ungrouped locations, location by location in the order the
//!    policy returned them. These are never merged or zipped.
//! 2. One block per group, ascending by key.
//!
//! There is no global merge across groups.

pub mod grouping;
pub mod location;

use std::collections::{HashMap, HashSet};
use std::mem;

use itertools::Itertools as _;
use thiserror::Error;
use tracing::{debug, error, instrument, trace};

pub use grouping::{ConfiguredGrouping, NoGrouping};
pub use location::{Grouping, GroupingPolicy, Location, LocationGroup};

// ---------------------------------------------------------------------------
// ListsZipper
// ---------------------------------------------------------------------------

/// Strategy that orders records and combines records seen at several
/// locations of one group.
pub trait ListsZipper {
    /// Location type records are registered under.
    type Location: Location;
    /// One per-location change-list entry.
    type Record: Clone;
    /// Location-independent ordering key (e.g. a revision number).
    type Key: Ord;

    /// The record's ordering key. Records are "equal" iff their keys are.
    fn key(&self, record: &Self::Record) -> Self::Key;

    /// Combine `records` into one record representing their union.
    ///
    /// Only called with two or more records, all sharing one key and all
    /// coming from locations in `group`. Returns `None` only for an empty
    /// `records`, which the zipper reports as [`ZipError::EmptyRun`].
    fn zip(
        &self,
        group: &LocationGroup<Self::Location>,
        records: Vec<Self::Record>,
    ) -> Option<Self::Record>;
}

// ---------------------------------------------------------------------------
// ZipError
// ---------------------------------------------------------------------------

/// Errors returned by [`SequencesZipper::execute`].
///
/// All of these are contract violations by a collaborator; retrying cannot
/// change the outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZipError {
    /// A registered location was neither grouped nor listed as ungrouped.
    #[error("grouping policy dropped location `{location}`")]
    MissingLocation {
        /// Presentable key of the dropped location.
        location: String,
    },

    /// A location was placed more than once across groups and the ungrouped list.
    #[error("grouping policy placed location `{location}` more than once")]
    DuplicateLocation {
        /// Presentable key of the duplicated location.
        location: String,
    },

    /// The grouping policy returned a location that was never registered.
    #[error("grouping policy returned unregistered location `{location}`")]
    UnknownLocation {
        /// Presentable key of the unknown location.
        location: String,
    },

    /// A run of equal records was closed with no records in it.
    #[error("cannot zip an empty run of records in group `{group}`")]
    EmptyRun {
        /// Name of the group being zipped.
        group: String,
    },
}

// ---------------------------------------------------------------------------
// SequencesZipper
// ---------------------------------------------------------------------------

/// Collects per-location record sequences and zips them into one sequence.
///
/// Build-then-consume: register every location with [`add`](Self::add), then
/// call [`execute`](Self::execute) (any number of times).
///
/// ```rust,ignore
/// let mut zipper = SequencesZipper::new(RevisionZipper, ConfiguredGrouping::new(&config.zip));
/// zipper.add(origin, origin_records);
/// zipper.add(mirror, mirror_records);
/// let history = zipper.execute()?;
/// ```
pub struct SequencesZipper<Z: ListsZipper, G> {
    zipper: Z,
    grouping: G,
    locations: Vec<Z::Location>,
    lists: HashMap<String, Vec<Z::Record>>,
}

impl<Z, G> SequencesZipper<Z, G>
where
    Z: ListsZipper,
    G: GroupingPolicy<Z::Location>,
{
    /// Create an empty zipper.
    pub fn new(zipper: Z, grouping: G) -> Self {
        Self {
            zipper,
            grouping,
            locations: Vec::new(),
            lists: HashMap::new(),
        }
    }

    /// Register `records` fetched from `location`.
    ///
    /// The records are stable-sorted by key. Adding the same location again
    /// replaces its records; it keeps its original registration position.
    pub fn add(&mut self, location: Z::Location, mut records: Vec<Z::Record>) {
        records.sort_by_key(|record| self.zipper.key(record));

        let key = location.presentable().to_owned();
        if self.lists.insert(key, records).is_none() {
            self.locations.push(location);
        } else {
            debug!(location = location.presentable(), "replacing registered records");
        }
    }

    /// Registered locations, in registration order.
    #[must_use]
    pub fn locations(&self) -> &[Z::Location] {
        &self.locations
    }

    /// Zip all registered sequences into one.
    ///
    /// # Errors
    /// Returns [`ZipError`] if the grouping policy drops, duplicates, or
    /// invents a location.
    #[instrument(skip_all, fields(locations = self.locations.len()))]
    pub fn execute(&self) -> Result<Vec<Z::Record>, ZipError> {
        let grouping = self.grouping.group_locations(&self.locations);
        if let Err(e) = self.validate(&grouping) {
            error!(error = %e, "rejecting malformed location grouping");
            return Err(e);
        }

        let mut result = Vec::with_capacity(self.lists.values().map(Vec::len).sum());

        for location in &grouping.ungrouped {
            result.extend(self.records_of(location)?.iter().cloned());
        }
        for group in &grouping.groups {
            let zipped = self.merge_group(group)?;
            trace!(group = group.name(), records = zipped.len(), "zipped group");
            result.extend(zipped);
        }

        debug!(
            groups = grouping.groups.len(),
            ungrouped = grouping.ungrouped.len(),
            records = result.len(),
            "zipped sequences"
        );
        Ok(result)
    }

    /// Check that `grouping` is a partition of the registered locations.
    fn validate(&self, grouping: &Grouping<Z::Location>) -> Result<(), ZipError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.locations.len());

        let placed = grouping
            .groups
            .iter()
            .flat_map(LocationGroup::locations)
            .chain(&grouping.ungrouped);
        for location in placed {
            let key = location.presentable();
            if !self.lists.contains_key(key) {
                return Err(ZipError::UnknownLocation {
                    location: key.to_owned(),
                });
            }
            if !seen.insert(key) {
                return Err(ZipError::DuplicateLocation {
                    location: key.to_owned(),
                });
            }
        }

        match self
            .locations
            .iter()
            .find(|l| !seen.contains(l.presentable()))
        {
            Some(missing) => Err(ZipError::MissingLocation {
                location: missing.presentable().to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn records_of(&self, location: &Z::Location) -> Result<&[Z::Record], ZipError> {
        self.lists
            .get(location.presentable())
            .map(Vec::as_slice)
            .ok_or_else(|| ZipError::UnknownLocation {
                location: location.presentable().to_owned(),
            })
    }

    /// Stable k-way merge of the group's sequences, then zip equal runs.
    fn merge_group(
        &self,
        group: &LocationGroup<Z::Location>,
    ) -> Result<Vec<Z::Record>, ZipError> {
        let sources = group
            .locations()
            .iter()
            .map(|location| self.records_of(location))
            .collect::<Result<Vec<_>, _>>()?;

        // Ties go to the earlier member; within one member, order is kept
        // because only its head is ever in the merge heap.
        let merged = sources
            .into_iter()
            .enumerate()
            .map(|(source, records)| records.iter().map(move |record| (source, record)))
            .kmerge_by(|(sa, a), (sb, b)| {
                (self.zipper.key(a), *sa) < (self.zipper.key(b), *sb)
            });

        let mut result = Vec::new();
        let mut run: Vec<Z::Record> = Vec::new();
        let mut run_key: Option<Z::Key> = None;

        for (_, record) in merged {
            let key = self.zipper.key(record);
            if run_key.as_ref().is_some_and(|k| *k != key) {
                result.push(self.zip_run(group, mem::take(&mut run))?);
            }
            run_key = Some(key);
            run.push(record.clone());
        }
        if !run.is_empty() {
            result.push(self.zip_run(group, run)?);
        }

        Ok(result)
    }

    fn zip_run(
        &self,
        group: &LocationGroup<Z::Location>,
        mut run: Vec<Z::Record>,
    ) -> Result<Z::Record, ZipError> {
        let zipped = match run.len() {
            0 => None,
            1 => run.pop(),
            _ => self.zipper.zip(group, run),
        };
        zipped.ok_or_else(|| ZipError::EmptyRun {
            group: group.name().to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------
