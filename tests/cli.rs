//! `weave` binary: JSON in, JSON out.

#![allow(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const MIRROR_A: &str = "https://a.example/repo.git";
const MIRROR_B: &str = "https://b.example/repo.git";
const FORK: &str = "https://fork.example/repo.git";

fn weave_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_weave"))
        .args(args)
        .current_dir(dir)
        .env_remove("WEAVE_CONFIG")
        .env_remove("WEAVE_LOG")
        .output()
        .expect("failed to execute weave")
}

fn weave_json(dir: &Path, args: &[&str]) -> Value {
    let out = weave_in(dir, args);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "weave {} failed:\nstdout: {stdout}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_str(&stdout).expect("valid JSON output")
}

fn write(dir: &TempDir, name: &str, contents: &str) {
    std::fs::write(dir.path().join(name), contents).unwrap();
}

fn zip_input() -> String {
    serde_json::json!({
        "locations": [
            {
                "location": MIRROR_A,
                "records": [
                    {"revision": 3, "commit": "c3", "message": "third"},
                    {"revision": 1, "commit": "c1", "message": "first"}
                ]
            },
            {
                "location": FORK,
                "records": [{"revision": 9, "commit": "f9"}]
            },
            {
                "location": MIRROR_B,
                "records": [
                    {"revision": 2, "commit": "c2"},
                    {"revision": 3, "commit": "c3"}
                ]
            }
        ]
    })
    .to_string()
}

fn revisions(history: &Value) -> Vec<u64> {
    history
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["revision"].as_u64().unwrap())
        .collect()
}

#[test]
fn zip_merges_configured_mirrors_after_ungrouped_locations() {
    let dir = TempDir::new().unwrap();
    write(&dir, "records.json", &zip_input());
    write(
        &dir,
        "weave.toml",
        &format!(
            r#"
[[zip.groups]]
name = "upstream"
locations = ["{MIRROR_A}", "{MIRROR_B}"]
"#
        ),
    );

    let history = weave_json(dir.path(), &["zip", "records.json"]);

    assert_eq!(revisions(&history), vec![9, 1, 2, 3]);
    assert_eq!(history[0]["locations"], serde_json::json!([FORK]));
    assert_eq!(history[3]["commit"].as_str(), Some("c3"));
    assert_eq!(history[3]["message"].as_str(), Some("third"));
    assert_eq!(history[3]["locations"], serde_json::json!([MIRROR_A, MIRROR_B]));
}

#[test]
fn zip_without_config_keeps_locations_apart() {
    let dir = TempDir::new().unwrap();
    write(&dir, "records.json", &zip_input());

    let history = weave_json(dir.path(), &["zip", "records.json"]);

    assert_eq!(revisions(&history), vec![1, 3, 9, 2, 3]);
}

#[test]
fn zip_reads_config_from_flag() {
    let dir = TempDir::new().unwrap();
    write(&dir, "records.json", &zip_input());
    write(
        &dir,
        "mirrors.toml",
        &format!(
            r#"
[[zip.groups]]
name = "upstream"
locations = ["{MIRROR_B}", "{MIRROR_A}"]
"#
        ),
    );

    let history = weave_json(dir.path(), &["zip", "records.json", "--config", "mirrors.toml"]);

    assert_eq!(revisions(&history), vec![9, 1, 2, 3]);
    assert_eq!(history[3]["locations"], serde_json::json!([MIRROR_B, MIRROR_A]));
}

#[test]
fn changes_reports_merged_sources_and_parents() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "commit.json",
        r#"{
  "parents": [
    [{"path": "f.txt", "type": "added"}, {"path": "g.txt", "type": "modified"}],
    [{"path": "f.txt", "type": "modified"}]
  ]
}"#,
    );

    let report = weave_json(dir.path(), &["changes", "commit.json"]);

    assert_eq!(report["size"].as_u64(), Some(3));

    let merged = report["merged"].as_array().unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0]["before"].as_str(), Some("f.txt"));
    assert_eq!(merged[0]["after"].as_str(), Some("f.txt"));

    let sources = merged[0]["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources[0]["before"].is_null());
    assert_eq!(sources[0]["parent"].as_u64(), Some(0));
    assert_eq!(sources[1]["before"].as_str(), Some("f.txt"));
    assert_eq!(sources[1]["parent"].as_u64(), Some(1));

    let parents = report["parents"].as_array().unwrap();
    assert_eq!(parents.len(), 2);
    assert_eq!(parents[0].as_array().unwrap().len(), 2);
    assert_eq!(parents[1][0]["parent"].as_u64(), Some(1));
}

#[test]
fn changes_of_single_parent_commit_have_no_sources() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "commit.json",
        r#"{"parents": [[{"path": "b.rs", "type": "renamed", "from": "a.rs"}]]}"#,
    );

    let report = weave_json(dir.path(), &["changes", "commit.json"]);

    let merged = report["merged"].as_array().unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0]["before"].as_str(), Some("a.rs"));
    assert_eq!(merged[0]["after"].as_str(), Some("b.rs"));
    assert!(merged[0].get("sources").is_none());
}

#[test]
fn malformed_json_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.json", "{\"locations\": [");

    for subcommand in ["zip", "changes"] {
        let out = weave_in(dir.path(), &[subcommand, "broken.json"]);
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(!out.status.success(), "weave {subcommand} accepted broken input");
        assert!(stderr.contains("invalid JSON"), "stderr: {stderr}");
    }
}

#[test]
fn invalid_config_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    write(&dir, "records.json", &zip_input());
    write(&dir, "weave.toml", "[[zip.groups]]\nname = \"empty\"\nlocations = []\n");

    let out = weave_in(dir.path(), &["zip", "records.json"]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(!out.status.success());
    assert!(stderr.contains("has no locations"), "stderr: {stderr}");
}
