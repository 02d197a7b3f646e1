//! Integration tests for the rankdex binary.
//!
//! Every run passes `--file` with a temporary snapshot, so a daemon running
//! on the machine never serves these queries.

use rankdex::snapshot::{PointsEntry, SnapshotWriter};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rankdex_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rankdex"))
}

/// Run rankdex against `file`, returning (stdout, stderr, success)
fn run_rankdex(file: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(rankdex_binary())
        .arg("--file")
        .arg(file)
        .arg("--no-color")
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run rankdex");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn fixture() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ranks.bin");

    let mut writer = SnapshotWriter::new();
    writer
        .add_player("Alice", [(900, 1), (500, 2), (0, 0), (0, 0), (0, 0), (0, 0)])
        .add_player("albert", [(700, 2), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0)])
        .add_player("bob", [(400, 3), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0)])
        .add_prefix(
            "a",
            vec![PointsEntry::new("Alice", 900), PointsEntry::new("albert", 700)],
        );
    writer.write_atomic(&path).unwrap();

    (dir, path)
}

#[test]
fn test_player_text() {
    let (_dir, path) = fixture();

    let (stdout, stderr, ok) = run_rankdex(&path, &["player", "alice"]);
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.starts_with("Alice\n"));
    assert!(stdout.contains("#1"));

    let (stdout, _, ok) = run_rankdex(&path, &["player", "nobody"]);
    assert!(ok);
    assert_eq!(stdout, "Player not found\n");
}

#[test]
fn test_player_json() {
    let (_dir, path) = fixture();

    let (stdout, _, ok) = run_rankdex(&path, &["--json", "player", "BOB"]);
    assert!(ok);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["name"], "bob");
    assert_eq!(value["points"]["points"], 400);

    let (stdout, _, _) = run_rankdex(&path, &["--json", "player", "zed"]);
    assert_eq!(stdout.trim(), r#"{"name":null}"#);
}

#[test]
fn test_prefix_json() {
    let (_dir, path) = fixture();

    let (stdout, _, ok) = run_rankdex(&path, &["prefix", "a", "--json"]);
    assert!(ok);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(value["player"].is_null());
    assert_eq!(value["top10"][0]["name"], "Alice");
    assert_eq!(value["top10"][1]["points"], 700);
}

#[test]
fn test_missing_file_means_no_data() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.bin");

    let (stdout, _, ok) = run_rankdex(&missing, &["--json", "prefix", "a"]);
    assert!(ok);
    assert_eq!(stdout.trim(), "null");

    let (stdout, _, ok) = run_rankdex(&missing, &["player", "a"]);
    assert!(ok);
    assert_eq!(stdout, "No ranking data loaded yet\n");
}

#[test]
fn test_stats_and_verify() {
    let (_dir, path) = fixture();

    let (stdout, _, ok) = run_rankdex(&path, &["stats"]);
    assert!(ok);
    assert!(stdout.contains("Players:          3"));
    assert!(stdout.contains("Cached prefixes:  1"));

    let (stdout, _, ok) = run_rankdex(&path, &["verify"]);
    assert!(ok);
    assert!(stdout.trim_end().ends_with("OK"));

    // A cached list out of points order fails verification
    let mut writer = SnapshotWriter::new();
    writer
        .add_player("x", [(1, 1), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0)])
        .add_prefix("x", vec![PointsEntry::new("xa", 1), PointsEntry::new("xb", 5)]);
    writer.write_atomic(&path).unwrap();

    let (_, _, ok) = run_rankdex(&path, &["verify"]);
    assert!(!ok);
}
