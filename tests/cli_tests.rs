//! Integration tests for the cife CLI
//!
//! These tests run the cife binary against tables in temporary directories.

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// cife running in `dir`, isolated from any user configuration
fn cife(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("cife");
    cmd.current_dir(dir)
        .env("CIFE_CONFIG_DIR", dir)
        .env_remove("CIFE_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("CIFE_LOG");
    cmd
}

fn write_lines(path: &Path, rows: &[Value]) {
    let text: String = rows.iter().map(|row| format!("{}\n", row)).collect();
    fs::write(path, text).unwrap();
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn three_row_run() -> Vec<Value> {
    vec![
        serde_json::json!({"id": "r1", "dataset": "d", "correctness_level": "Completely Correct",
                           "constraint_adherence": [1, 1, 1]}),
        serde_json::json!({"id": "r2", "dataset": "d", "correctness_level": "Partially Correct",
                           "constraint_adherence": [1, 0, 1]}),
        serde_json::json!({"id": "r3", "dataset": "d", "correctness_level": "Wrong",
                           "constraint_adherence": []}),
    ]
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = tempdir().unwrap();
    cife(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: cife"))
        .stdout(predicate::str::contains("judge"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("metrics"))
        .stdout(predicate::str::contains("rank"))
        .stdout(predicate::str::contains("filter"));
}

#[test]
fn test_version_flag() {
    let dir = tempdir().unwrap();
    cife(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cife"));
}

#[test]
fn test_no_command_prints_banner() {
    let dir = tempdir().unwrap();
    cife(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cife --help"));
}

// ============================================================================
// metrics
// ============================================================================

#[test]
fn test_metrics_writes_detail_and_appends_summary() {
    let dir = tempdir().unwrap();
    write_lines(&dir.path().join("run.jsonl"), &three_row_run());

    let output = cife(dir.path())
        .args([
            "--format",
            "json",
            "metrics",
            "--input",
            "run.jsonl",
            "--output-dir",
            "out",
            "--summary-file",
            "summary.jsonl",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["filename"], "run.jsonl");
    assert!((summary["Overall_CSR"].as_f64().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    assert!((summary["Overall_SSR"].as_f64().unwrap() - 0.5556).abs() < 1e-3);
    assert_eq!(summary["Scored_Rows"], 3);
    assert_eq!(summary["Row_Failures"]["empty_flag_rows"], 1);

    let detailed = read_lines(&dir.path().join("out/run_metrics_extended.jsonl"));
    assert_eq!(detailed.len(), 3);
    assert_eq!(detailed[1]["CSR_per_row"], 0);
    assert_eq!(detailed[2]["CSR_per_row"], 1);

    cife(dir.path())
        .args([
            "metrics",
            "--input",
            "run.jsonl",
            "--output-dir",
            "out",
            "--summary-file",
            "summary.jsonl",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall CSR: 66.67%"));

    assert_eq!(read_lines(&dir.path().join("summary.jsonl")).len(), 2);
}

#[test]
fn test_metrics_column_override() {
    let dir = tempdir().unwrap();
    write_lines(
        &dir.path().join("run.jsonl"),
        &[serde_json::json!({"id": 1, "dataset": "d", "flags": [1, 0]})],
    );

    let output = cife(dir.path())
        .args(["--format", "json", "metrics", "--input", "run.jsonl", "--column", "flags"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["Overall_SSR"], 0.5);
}

#[test]
fn test_metrics_missing_column_json_error() {
    let dir = tempdir().unwrap();
    write_lines(
        &dir.path().join("run.jsonl"),
        &[serde_json::json!({"id": 1, "dataset": "d"})],
    );

    let output = cife(dir.path())
        .args(["--format", "json", "metrics", "--input", "run.jsonl"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], 3);
    assert_eq!(error["error"]["type"], "missing_column");
}

#[test]
fn test_metrics_missing_input_exit_code_3() {
    let dir = tempdir().unwrap();
    cife(dir.path())
        .args(["metrics", "--input", "nope.jsonl"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("input not found"));
}

#[test]
fn test_unknown_format_exit_code_2() {
    let dir = tempdir().unwrap();
    cife(dir.path())
        .args(["--format", "records", "metrics", "--input", "run.jsonl"])
        .assert()
        .code(2);
}

#[test]
fn test_invalid_config_is_usage_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("cife.toml"), "[judge]\nconcurrency = 0\n").unwrap();
    write_lines(&dir.path().join("run.jsonl"), &three_row_run());

    cife(dir.path())
        .args(["metrics", "--input", "run.jsonl"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("judge.concurrency"));
}

// ============================================================================
// extract
// ============================================================================

#[test]
fn test_extract_rederives_columns_offline() {
    let dir = tempdir().unwrap();
    write_lines(
        &dir.path().join("judged.jsonl"),
        &[
            serde_json::json!({
                "id": "a",
                "final_constraints": ["use a loop", "no imports"],
                "constraint_adherence_response":
                    "```json\n{\"Evaluation\": [{\"Constraint\": \"use a loop\", \"Reason\": \"ok\", \"Aligns\": [true]}, {\"Constraint\": \"no imports\", \"Reason\": \"imports os\", \"Aligns\": [false]}]}\n```",
                "code_correctness_response": "{\"reason\": \"fine\", \"correctness\": \"Completely Correct\"}"
            }),
            serde_json::json!({
                "id": "b",
                "constraint_adherence_response": "The judge timed out.",
                "code_correctness_response": null
            }),
        ],
    );

    let output = cife(dir.path())
        .args([
            "--format",
            "json",
            "extract",
            "--input",
            "judged.jsonl",
            "--output",
            "extracted.jsonl",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["rows"], 2);
    assert_eq!(report["failures"]["absent_rows"], 1);

    let rows = read_lines(&dir.path().join("extracted.jsonl"));
    assert_eq!(rows[0]["constraint_adherence"], serde_json::json!([1, 0]));
    assert_eq!(rows[0]["correctness_level"], "Completely Correct");
    assert_eq!(rows[0]["scored_constraints"][1]["constraint"], "no imports");
    assert_eq!(rows[1]["constraint_adherence"], Value::Null);
}

// ============================================================================
// rank and filter
// ============================================================================

fn write_runs(runs: &Path) {
    fs::create_dir_all(runs).unwrap();
    write_lines(
        &runs.join("model_a.jsonl"),
        &[
            serde_json::json!({"id": "a", "final_constraints": ["x", "y"], "constraint_adherence": [1, 1]}),
            serde_json::json!({"id": "b", "final_constraints": ["x", "y"], "constraint_adherence": [1, 0]}),
            serde_json::json!({"id": "c", "final_constraints": ["w", "x", "y", "z"], "constraint_adherence": [1, 0, 0, 0]}),
        ],
    );
    write_lines(
        &runs.join("model_b.jsonl"),
        &[
            serde_json::json!({"id": "a", "final_constraints": ["x", "y"], "constraint_adherence": [1, 1]}),
            serde_json::json!({"id": "b", "final_constraints": ["x", "y"], "constraint_adherence": [0, 0]}),
            serde_json::json!({"id": "c", "final_constraints": ["w", "x", "y", "z"], "constraint_adherence": [0, 0, 0, 1]}),
        ],
    );
}

#[test]
fn test_rank_then_filter() {
    let dir = tempdir().unwrap();
    write_runs(&dir.path().join("runs"));

    cife(dir.path())
        .args(["rank", "--input-dir", "runs", "--output", "ranked.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ranked 3 instances across 2 models"));

    let ranked = read_lines(&dir.path().join("ranked.jsonl"));
    let order: Vec<&str> = ranked.iter().map(|r| r["id"].as_str().unwrap()).collect();
    // b and c tie on mean SSR; c has more constraints
    assert_eq!(order, vec!["a", "c", "b"]);
    assert_eq!(ranked[0]["overall_ssr"], 1.0);
    assert_eq!(ranked[0]["ssr_model_a"], 1.0);
    assert_eq!(ranked[1]["num_constraints"], 4);
    assert!(ranked[0].get("constraint_adherence").is_none());

    let output = cife(dir.path())
        .args([
            "--format",
            "json",
            "filter",
            "--ranked",
            "ranked.jsonl",
            "--drop-top",
            "1",
            "--input-dir",
            "runs",
            "--output-dir",
            "filtered",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["retained"], 2);
    assert_eq!(report["files"][0]["before"], 3);
    assert_eq!(report["files"][0]["after"], 2);

    for name in ["model_a.jsonl", "model_b.jsonl"] {
        let rows = read_lines(&dir.path().join("filtered").join(name));
        let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}

#[test]
fn test_rank_empty_directory_is_data_error() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("runs")).unwrap();

    cife(dir.path())
        .args(["rank", "--input-dir", "runs", "--output", "ranked.jsonl"])
        .assert()
        .code(3);
}

// ============================================================================
// judge
// ============================================================================

#[test]
fn test_judge_without_api_key_is_usage_error() {
    let dir = tempdir().unwrap();
    write_lines(
        &dir.path().join("responses.jsonl"),
        &[serde_json::json!({"id": 1, "response": "print(1)"})],
    );

    cife(dir.path())
        .env_remove("OPENAI_API_KEY")
        .args(["judge", "--input", "responses.jsonl", "--output", "judged.jsonl"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
