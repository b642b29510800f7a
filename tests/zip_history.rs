//! End-to-end zipping of mirrored histories.
//!
//! Random histories are generated per seed: a shared upstream history that
//! each mirror only partially fetched, plus an unrelated fork. The zipped
//! output must hold every upstream revision exactly once, in order, after the
//! fork's records.

#![allow(clippy::all, clippy::pedantic, clippy::nursery)]

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use weave::config::WeaveConfig;
use weave::record::{ChangeListRecord, RevisionZipper};
use weave::zipper::{ConfiguredGrouping, SequencesZipper, ZipError};
use weave_git::{RepositoryLocation, Revision};

const SEEDS: u64 = 100;
const MIRRORS: [&str; 3] = [
    "https://a.example/repo.git",
    "https://b.example/repo.git",
    "ssh://c.example/repo.git",
];
const FORK: &str = "https://fork.example/repo.git";

fn config() -> WeaveConfig {
    WeaveConfig::parse(&format!(
        r#"
[[zip.groups]]
name = "upstream"
locations = ["{}", "{}", "{}"]
"#,
        MIRRORS[0], MIRRORS[1], MIRRORS[2]
    ))
    .unwrap()
}

fn records(location: &str, revisions: impl IntoIterator<Item = u64>) -> Vec<ChangeListRecord> {
    revisions
        .into_iter()
        .map(|rev| {
            ChangeListRecord::new(
                Revision::new(rev),
                format!("commit-{rev}"),
                RepositoryLocation::new(location),
            )
        })
        .collect()
}

#[test]
fn mirrored_histories_collapse_by_revision() {
    let config = config();

    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let history_len = rng.random_range(1..=40u64);

        let mut zipper = SequencesZipper::new(RevisionZipper, ConfiguredGrouping::new(&config.zip));
        let mut expected: BTreeSet<u64> = BTreeSet::new();
        let mut seen_at: Vec<Vec<&str>> = vec![Vec::new(); history_len as usize + 1];

        for mirror in MIRRORS {
            let mut fetched: Vec<u64> =
                (1..=history_len).filter(|_| rng.random_bool(0.6)).collect();
            // Mirrors report newest first; the zipper must not care.
            fetched.reverse();
            for &rev in &fetched {
                seen_at[rev as usize].push(mirror);
            }
            expected.extend(&fetched);
            zipper.add(RepositoryLocation::new(mirror), records(mirror, fetched));
        }
        let fork_len = rng.random_range(0..5u64);
        zipper.add(RepositoryLocation::new(FORK), records(FORK, 100..100 + fork_len));

        let history = zipper.execute().unwrap_or_else(|e| panic!("seed {seed}: {e}"));

        let (fork, upstream) = history.split_at(fork_len as usize);
        assert!(fork.iter().all(|r| r.locations == vec![RepositoryLocation::new(FORK)]));

        let revisions: Vec<u64> = upstream.iter().map(|r| r.revision.number()).collect();
        assert_eq!(
            revisions,
            expected.iter().copied().collect::<Vec<_>>(),
            "seed {seed}"
        );

        for record in upstream {
            let locations: Vec<&str> = record.locations.iter().map(|l| l.as_str()).collect();
            assert_eq!(
                locations,
                seen_at[record.revision.number() as usize],
                "seed {seed}, revision {}",
                record.revision
            );
        }
    }
}

#[test]
fn zipping_twice_gives_the_same_history() {
    let config = config();
    let mut rng = StdRng::seed_from_u64(7);
    let mut zipper = SequencesZipper::new(RevisionZipper, ConfiguredGrouping::new(&config.zip));
    for mirror in MIRRORS {
        let revs: Vec<u64> = (1..=20).filter(|_| rng.random_bool(0.5)).collect();
        zipper.add(RepositoryLocation::new(mirror), records(mirror, revs));
    }

    assert_eq!(zipper.execute().unwrap(), zipper.execute().unwrap());
}

#[test]
fn unknown_group_member_is_an_error() {
    let mut zipper = SequencesZipper::new(RevisionZipper, |locations: &[RepositoryLocation]| {
        let mut grouping = weave::zipper::Grouping::ungrouped(Vec::new());
        let mut members = locations.to_vec();
        members.push(RepositoryLocation::new("https://ghost.example/repo.git"));
        grouping
            .groups
            .push(weave::zipper::LocationGroup::new("haunted", members));
        grouping
    });
    zipper.add(
        RepositoryLocation::new(MIRRORS[0]),
        records(MIRRORS[0], [1, 2]),
    );

    let err = zipper.execute().unwrap_err();
    assert!(matches!(err, ZipError::UnknownLocation { .. }), "{err}");
}
