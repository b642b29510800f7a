use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use weave::changes::{LazyChangeSet, PathChangeParser};
use weave::config::{CONFIG_FILE_NAME, WeaveConfig};
use weave::record::{ChangeListRecord, RevisionZipper};
use weave::zipper::{ConfiguredGrouping, SequencesZipper};
use weave_git::{FileStatusInfo, PathChange, RepositoryLocation};

/// Weave commit histories fetched from several locations
///
/// Mirrors of the same repository report the same commits; weave lines them
/// up by revision and collapses the duplicates. It can also show which file
/// changes a merge commit shares with all of its parents.
///
/// Set WEAVE_LOG=debug to see what the zipper decides.
#[derive(Parser)]
#[command(name = "weave")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Zip per-location change lists into one history
    ///
    /// Input is JSON: {"locations": [{"location": "<url>", "records": [...]}]}.
    /// Locations grouped under [[zip.groups]] in the config are merged by
    /// revision; all others are printed first, as given.
    Zip {
        /// Path to the JSON input
        input: PathBuf,

        /// Config file declaring mirror groups
        #[arg(long, env = "WEAVE_CONFIG", default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
    },

    /// Show the changes of one commit
    ///
    /// Input is JSON: {"parents": [[{"path": "f.txt", "type": "modified"}], ...]},
    /// one status list per parent.
    Changes {
        /// Path to the JSON input
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    weave::telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Zip { input, config } => zip(&input, &config),
        Commands::Changes { input } => changes(&input),
    }
}

// ---------------------------------------------------------------------------
// weave zip
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ZipInput {
    locations: Vec<LocationInput>,
}

#[derive(Deserialize)]
struct LocationInput {
    location: RepositoryLocation,
    records: Vec<ChangeListRecord>,
}

fn zip(input: &Path, config: &Path) -> Result<()> {
    let config = WeaveConfig::load(config)?;
    let input: ZipInput = read_json(input)?;

    let mut zipper = SequencesZipper::new(RevisionZipper, ConfiguredGrouping::new(&config.zip));
    for LocationInput { location, mut records } in input.locations {
        for record in &mut records {
            if record.locations.is_empty() {
                record.locations.push(location.clone());
            }
        }
        zipper.add(location, records);
    }

    let history = zipper.execute().context("failed to zip change lists")?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// weave changes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CommitInput {
    parents: Vec<Vec<FileStatusInfo>>,
}

#[derive(Serialize)]
struct ChangesReport {
    size: usize,
    merged: Vec<MergedEntry>,
    parents: Vec<Vec<PathChange>>,
}

#[derive(Serialize)]
struct MergedEntry {
    #[serde(flatten)]
    change: PathChange,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<PathChange>,
}

fn changes(input: &Path) -> Result<()> {
    let input: CommitInput = read_json(input)?;
    let set: LazyChangeSet<PathChange> =
        LazyChangeSet::new(input.parents, Arc::new(PathChangeParser));

    let merged = set
        .merged_changes()
        .context("failed to parse merged changes")?
        .iter()
        .map(|entry| MergedEntry {
            change: entry.change().clone(),
            sources: entry
                .as_merged()
                .map(|merged| merged.source_changes().to_vec())
                .unwrap_or_default(),
        })
        .collect();

    let parents = (0..set.parent_count())
        .map(|parent| -> Result<Vec<PathChange>> {
            let changes = set
                .changes(parent)
                .with_context(|| format!("failed to parse changes to parent {parent}"))?;
            Ok(changes.iter().map(|c| c.change().clone()).collect())
        })
        .collect::<Result<Vec<_>>>()?;

    let report = ChangesReport {
        size: set.size(),
        merged,
        parents,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}
