//! Committed change-list records and the revision-keyed zip strategy.

use serde::{Deserialize, Serialize};
use tracing::warn;
use weave_git::{RepositoryLocation, Revision};

use crate::zipper::{ListsZipper, LocationGroup};

// ---------------------------------------------------------------------------
// ChangeListRecord
// ---------------------------------------------------------------------------

/// One committed change list as reported by one or more locations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeListRecord {
    /// Location-independent revision number.
    pub revision: Revision,
    /// Commit identifier at the reporting location.
    pub commit: String,
    /// Commit author.
    #[serde(default)]
    pub author: String,
    /// Commit message.
    #[serde(default)]
    pub message: String,
    /// Locations this record was seen at, in first-seen order.
    #[serde(default)]
    pub locations: Vec<RepositoryLocation>,
}

impl ChangeListRecord {
    /// A record seen at a single location.
    pub fn new(
        revision: Revision,
        commit: impl Into<String>,
        location: RepositoryLocation,
    ) -> Self {
        Self {
            revision,
            commit: commit.into(),
            author: String::new(),
            message: String::new(),
            locations: vec![location],
        }
    }
}

// ---------------------------------------------------------------------------
// RevisionZipper
// ---------------------------------------------------------------------------

/// Zips [`ChangeListRecord`]s that share a revision number.
///
/// The zipped record keeps the first record's commit metadata and unions the
/// location lists.
#[derive(Clone, Copy, Debug, Default)]
pub struct RevisionZipper;

impl ListsZipper for RevisionZipper {
    type Location = RepositoryLocation;
    type Record = ChangeListRecord;
    type Key = Revision;

    fn key(&self, record: &ChangeListRecord) -> Revision {
        record.revision
    }

    fn zip(
        &self,
        group: &LocationGroup<RepositoryLocation>,
        records: Vec<ChangeListRecord>,
    ) -> Option<ChangeListRecord> {
        records.into_iter().reduce(|mut zipped, record| {
            if record.commit != zipped.commit {
                warn!(
                    %group,
                    revision = %zipped.revision,
                    kept = %zipped.commit,
                    other = %record.commit,
                    "mirrors disagree on the commit for a revision"
                );
            }
            for location in record.locations {
                if !zipped.locations.contains(&location) {
                    zipped.locations.push(location);
                }
            }
            zipped
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeaveConfig;
    use crate::zipper::{ConfiguredGrouping, NoGrouping, SequencesZipper};

    fn loc(url: &str) -> RepositoryLocation {
        RepositoryLocation::new(url)
    }

    fn record(rev: u64, location: &str) -> ChangeListRecord {
        ChangeListRecord::new(Revision::new(rev), format!("c{rev}"), loc(location))
    }

    #[test]
    fn zip_unions_locations_in_first_seen_order() {
        let group = LocationGroup::new("g", vec![loc("a"), loc("b")]);
        let mut first = record(3, "a");
        first.locations.push(loc("c"));
        let zipped = RevisionZipper
            .zip(&group, vec![first, record(3, "b"), record(3, "a")])
            .unwrap();

        assert_eq!(zipped.revision, Revision::new(3));
        assert_eq!(zipped.commit, "c3");
        assert_eq!(zipped.locations, vec![loc("a"), loc("c"), loc("b")]);
    }

    #[test]
    fn zip_keeps_first_commit_when_mirrors_disagree() {
        let group = LocationGroup::new("g", vec![loc("a"), loc("b")]);
        let mut other = record(3, "b");
        other.commit = "different".to_owned();
        let zipped = RevisionZipper.zip(&group, vec![record(3, "a"), other]).unwrap();
        assert_eq!(zipped.commit, "c3");
        assert_eq!(zipped.locations.len(), 2);
    }

    #[test]
    fn zip_of_nothing_is_none() {
        let group = LocationGroup::new("g", vec![loc("a")]);
        assert_eq!(RevisionZipper.zip(&group, Vec::new()), None);
    }

    #[test]
    fn configured_mirrors_are_zipped() {
        let config = WeaveConfig::parse(
            r#"
[[zip.groups]]
name = "upstream"
locations = ["A", "B"]
"#,
        )
        .unwrap();
        let mut zipper = SequencesZipper::new(RevisionZipper, ConfiguredGrouping::new(&config.zip));
        zipper.add(loc("A"), vec![record(3, "A"), record(1, "A")]);
        zipper.add(loc("B"), vec![record(2, "B"), record(3, "B")]);
        zipper.add(loc("fork"), vec![record(9, "fork")]);

        let history = zipper.execute().unwrap();
        let revisions: Vec<u64> = history.iter().map(|r| r.revision.number()).collect();
        assert_eq!(revisions, vec![9, 1, 2, 3]);
        assert_eq!(history[3].locations, vec![loc("A"), loc("B")]);
    }

    #[test]
    fn record_json_defaults_optional_fields() {
        let parsed: ChangeListRecord =
            serde_json::from_str(r#"{"revision": 4, "commit": "abc"}"#).unwrap();
        assert_eq!(parsed.revision, Revision::new(4));
        assert!(parsed.author.is_empty());
        assert!(parsed.locations.is_empty());

        let mut zipper = SequencesZipper::new(RevisionZipper, NoGrouping);
        zipper.add(loc("x"), vec![parsed.clone()]);
        assert_eq!(zipper.execute().unwrap(), vec![parsed]);
    }
}
