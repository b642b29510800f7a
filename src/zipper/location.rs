//! Locations, location groups, and the grouping-policy seam.

use std::fmt;

use weave_git::RepositoryLocation;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A source that a per-location record sequence was fetched from.
///
/// The zipper stores and looks up sequences by [`Location::presentable`], so
/// two values with the same presentable key are the same location.
pub trait Location: Clone {
    /// Stable key used for lookups and diagnostics.
    fn presentable(&self) -> &str;
}

impl Location for RepositoryLocation {
    fn presentable(&self) -> &str {
        self.as_str()
    }
}

// ---------------------------------------------------------------------------
// LocationGroup
// ---------------------------------------------------------------------------

/// Locations that mirror each other and whose records are zipped together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationGroup<L> {
    name: String,
    locations: Vec<L>,
}

impl<L> LocationGroup<L> {
    /// Create a group with its members in merge order.
    pub fn new(name: impl Into<String>, locations: Vec<L>) -> Self {
        Self {
            name: name.into(),
            locations,
        }
    }

    /// The group's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in the order their sequences are merged. Earlier members win
    /// ties in the k-way merge.
    #[must_use]
    pub fn locations(&self) -> &[L] {
        &self.locations
    }
}

impl<L> fmt::Display for LocationGroup<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} locations)", self.name, self.locations.len())
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Result of a grouping policy: groups to zip, plus locations left alone.
///
/// Every location handed to the policy must show up exactly once, either in
/// one group or in `ungrouped`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grouping<L> {
    /// Groups in output order.
    pub groups: Vec<LocationGroup<L>>,
    /// Locations whose sequences are emitted as-is, in this order.
    pub ungrouped: Vec<L>,
}

impl<L> Grouping<L> {
    /// Every location ungrouped, in the given order.
    #[must_use]
    pub const fn ungrouped(locations: Vec<L>) -> Self {
        Self {
            groups: Vec::new(),
            ungrouped: locations,
        }
    }
}

/// Decides which registered locations are mirrors of each other.
pub trait GroupingPolicy<L> {
    /// Partition `locations` (in registration order) into groups and
    /// ungrouped locations.
    fn group_locations(&self, locations: &[L]) -> Grouping<L>;
}
