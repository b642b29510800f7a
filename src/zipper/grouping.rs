//! Built-in grouping policies.

use std::collections::HashSet;

use crate::config::{GroupConfig, ZipConfig};

use super::location::{Grouping, GroupingPolicy, Location, LocationGroup};

/// Any `Fn(&[L]) -> Grouping<L>` is a grouping policy.
impl<L, F> GroupingPolicy<L> for F
where
    F: Fn(&[L]) -> Grouping<L>,
{
    fn group_locations(&self, locations: &[L]) -> Grouping<L> {
        self(locations)
    }
}

// ---------------------------------------------------------------------------
// NoGrouping
// ---------------------------------------------------------------------------

/// Leaves every location ungrouped, in registration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGrouping;

impl<L: Clone> GroupingPolicy<L> for NoGrouping {
    fn group_locations(&self, locations: &[L]) -> Grouping<L> {
        Grouping::ungrouped(locations.to_vec())
    }
}

// ---------------------------------------------------------------------------
// ConfiguredGrouping
// ---------------------------------------------------------------------------

/// Groups locations as declared under `[[zip.groups]]` in `weave.toml`.
///
/// - Groups come out in config order; members in the order the config lists
///   them.
/// - Configured locations that were never registered are skipped, and a
///   group with no registered member is dropped.
/// - A location claimed by an earlier group is not claimed again.
/// - Everything left over is ungrouped, in registration order.
#[derive(Clone, Debug, Default)]
pub struct ConfiguredGrouping {
    groups: Vec<GroupConfig>,
}

impl ConfiguredGrouping {
    /// Build the policy from the `[zip]` config section.
    #[must_use]
    pub fn new(config: &ZipConfig) -> Self {
        Self {
            groups: config.groups.clone(),
        }
    }
}

impl<L: Location> GroupingPolicy<L> for ConfiguredGrouping {
    fn group_locations(&self, locations: &[L]) -> Grouping<L> {
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut groups = Vec::new();

        for group in &self.groups {
            let mut members = Vec::new();
            for key in &group.locations {
                let found = locations.iter().find(|l| l.presentable() == key.as_str());
                let Some(location) = found else {
                    continue;
                };
                if claimed.insert(location.presentable()) {
                    members.push(location.clone());
                }
            }
            if !members.is_empty() {
                groups.push(LocationGroup::new(group.name.clone(), members));
            }
        }

        let ungrouped = locations
            .iter()
            .filter(|l| !claimed.contains(l.presentable()))
            .cloned()
            .collect();

        Grouping { groups, ungrouped }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
