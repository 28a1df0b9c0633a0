//! CLI tests for the blastmap binary
//!
//! Spawns the binary against temporary projects and checks exit codes and
//! JSON output.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn blastmap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blastmap"))
        .args(args)
        .env_remove("BLASTMAP_FILE_TIMEOUT_SECS")
        .env_remove("BLASTMAP_MAX_FILE_SIZE")
        .output()
        .expect("Failed to start blastmap binary")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| panic!("bad JSON ({}): {}", e, stdout))
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

const BASE: &str = "def f():\n    return 1\n\n\ndef g():\n    return f()\n\n\ndef h():\n    return g()\n";
const HEAD: &str = "def f():\n    return 2\n\n\ndef g():\n    return f()\n\n\ndef h():\n    return g()\n";
const DIFF: &str = "diff --git a/m.py b/m.py\n--- a/m.py\n+++ b/m.py\n@@ -2,1 +2,1 @@\n-    return 1\n+    return 2\n";

/// `base/`, `head/` and `change.diff` under one temp dir.
fn snapshot_dirs() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "base/m.py", BASE);
    write(temp_dir.path(), "head/m.py", HEAD);
    write(temp_dir.path(), "head/README.md", "# not code");
    fs::write(temp_dir.path().join("change.diff"), DIFF).unwrap();
    temp_dir
}

fn path_arg(temp_dir: &TempDir, relative: &str) -> String {
    temp_dir.path().join(relative).to_string_lossy().to_string()
}

#[test]
fn test_graph_json_envelope() {
    let temp_dir = snapshot_dirs();
    let head = path_arg(&temp_dir, "head");
    let output = blastmap(&["graph", "--root", &head, "--enrich", "--output", "json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json = json_stdout(&output);
    assert_eq!(json["tool"], "blastmap");
    assert_eq!(json["schema_version"], "1.0.0");
    assert!(json.get("partial").is_none());
    assert_eq!(json["data"]["files_analyzed"], 1);
    assert_eq!(json["data"]["functions"], 3);
    assert_eq!(json["data"]["calls"], 2);
    assert_eq!(json["data"]["enriched"]["edges_by_kind"]["CALLS"], 2);
    // README.md is reported as skipped
    assert_eq!(json["data"]["diagnostics"][0]["type"], "skipped");
}

#[test]
fn test_missing_root_exits_with_structural_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = path_arg(&temp_dir, "nope");
    let output = blastmap(&["graph", "--root", &missing]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("BLM-ROOT-001"));

    let output = blastmap(&["graph", "--root", &missing, "--output", "json"]);
    assert_eq!(output.status.code(), Some(1));
    let json = json_stdout(&output);
    assert_eq!(json["data"]["code"], "BLM-ROOT-001");
}

#[test]
fn test_usage_errors_exit_2() {
    assert_eq!(blastmap(&[]).status.code(), Some(2));
    assert_eq!(blastmap(&["frobnicate"]).status.code(), Some(2));
    assert_eq!(blastmap(&["impact", "--direction", "sideways"]).status.code(), Some(2));
}

#[test]
fn test_version() {
    let output = blastmap(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("blastmap "));
}

#[test]
fn test_changes_json() {
    let temp_dir = snapshot_dirs();
    let (head, base, diff) = (
        path_arg(&temp_dir, "head"),
        path_arg(&temp_dir, "base"),
        path_arg(&temp_dir, "change.diff"),
    );
    let output = blastmap(&[
        "changes", "--head", &head, "--base", &base, "--diff", &diff, "--output", "json",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json = json_stdout(&output);
    let modified = json["data"]["changes"]["modified"].as_array().unwrap();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0]["name"], "f");
    assert_eq!(json["data"]["changes"]["added"].as_array().unwrap().len(), 0);
}

#[test]
fn test_impact_json() {
    let temp_dir = snapshot_dirs();
    let (head, base, diff) = (
        path_arg(&temp_dir, "head"),
        path_arg(&temp_dir, "base"),
        path_arg(&temp_dir, "change.diff"),
    );
    let output = blastmap(&[
        "impact", "--head", &head, "--base", &base, "--diff", &diff, "--kinds", "CALLS",
        "--output", "pretty",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json = json_stdout(&output);
    let data = &json["data"];
    assert_eq!(data["direction"], "backward");
    assert_eq!(data["kinds"][0], "CALLS");
    assert_eq!(data["report"]["summary"]["total"], 2);
    assert_eq!(data["report"]["summary"]["max_level"], 2);
    let levels = data["report"]["levels"].as_array().unwrap();
    assert_eq!(levels[0]["nodes"][0]["name"], "g");
    assert_eq!(levels[0]["nodes"][0]["severity"], "high");
    assert_eq!(levels[1]["nodes"][0]["name"], "h");
}

#[test]
fn test_unreadable_diff_is_structural_error() {
    let temp_dir = snapshot_dirs();
    let (head, base, diff) = (
        path_arg(&temp_dir, "head"),
        path_arg(&temp_dir, "base"),
        path_arg(&temp_dir, "missing.diff"),
    );
    let output = blastmap(&["changes", "--head", &head, "--base", &base, "--diff", &diff]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("BLM-DIF-001"));
}

#[test]
fn test_export_csv_to_file() {
    let temp_dir = snapshot_dirs();
    let head = path_arg(&temp_dir, "head");
    let out = path_arg(&temp_dir, "graph.csv");
    let output = blastmap(&["export", "--root", &head, "--format", "csv", "--out", &out]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let csv = fs::read_to_string(&out).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("from,from_name,kind,to,to_name,from_path,to_path"));
    assert_eq!(lines.filter(|l| l.contains(",CALLS,")).count(), 2);
}
