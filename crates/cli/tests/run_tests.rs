// End-to-end tests for `gridcheck run|validate|list` against a CSV workbook
// and recorded API responses under tests/fixtures.
//
// Run with: cargo test -p gridcheck-cli --test run_tests -- --nocapture

use std::path::PathBuf;
use std::process::{Command, Output};

fn gridcheck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridcheck"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("GRIDCHECK_FIXTURES");
    cmd.env_remove("GRIDCHECK_SECRETS");
    cmd.env_remove("GRIDCHECK_LOG");
    cmd
}

fn fixture(path: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(path)
        .to_string_lossy()
        .into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\nstdout:\n{stdout}"))
}

fn scenario<'a>(report: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    report["scenarios"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == name)
        .unwrap_or_else(|| panic!("no scenario {name} in {report}"))
}

// ===========================================================================
// run
// ===========================================================================

#[test]
fn passing_directory_exits_zero() {
    let output = gridcheck().args(["run", &fixture("scenarios/passing")]).output().unwrap();
    let err = stderr(&output);
    assert_eq!(output.status.code(), Some(0), "stderr:\n{err}");
    assert!(err.contains("PASS  View holdings"), "{err}");
    assert!(err.contains("PASS  View transactions"), "{err}");
    assert!(err.contains("PASS  View scopes"), "{err}");
    assert!(err.contains("PASS  View portfolios"), "{err}");
    assert!(err.contains("SKIP  Perform a reconciliation: not fully implemented"), "{err}");
    assert!(err.contains("5 scenario(s): 4 passed, 0 failed, 1 skipped"), "{err}");
    assert!(output.stdout.is_empty(), "human mode writes nothing to stdout");
}

#[test]
fn json_report_shape() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/passing"), "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));

    let report = json_stdout(&output);
    assert_eq!(report["summary"]["total"], 5);
    assert_eq!(report["summary"]["passed"], 4);
    assert_eq!(report["summary"]["skipped"], 1);
    assert!(report["meta"]["engine_version"].is_string());

    let holdings = scenario(&report, "View holdings");
    assert_eq!(holdings["outcome"], "passed");
    assert_eq!(holdings["exit_code"], 0);
    assert_eq!(holdings["report"]["status"], "matched");
    assert_eq!(holdings["report"]["meta"]["mode"], "containment");
    assert_eq!(holdings["report"]["summary"]["observed"], 2);
    assert_eq!(holdings["report"]["summary"]["reference"], 3);

    let transactions = scenario(&report, "View transactions");
    assert_eq!(transactions["report"]["meta"]["mode"], "exact");
    assert_eq!(transactions["report"]["summary"]["observed"], 2);

    let skipped = scenario(&report, "Perform a reconciliation");
    assert_eq!(skipped["outcome"], "skipped");
    assert_eq!(skipped["skip_reason"], "not fully implemented");
    assert!(skipped.get("report").is_none());
}

#[test]
fn portfolios_use_nested_ids_and_defined_name_dates() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/passing"), "--name", "View portfolios", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));

    let report = json_stdout(&output);
    let portfolios = scenario(&report, "View portfolios");
    assert_eq!(portfolios["report"]["status"], "matched");
    // The Sandbox portfolio is filtered out by scope, so exact mode sees 2 vs 2
    assert_eq!(portfolios["report"]["summary"]["observed"], 2);
    assert_eq!(portfolios["report"]["summary"]["reference"], 2);

    let params = portfolios["params"].as_object().unwrap();
    assert_eq!(params["scope"], "Finbourne-Examples");
    assert_eq!(params["effective_at"], "2024-03-31T00:00:00Z");
    assert!(!params.contains_key("as_at"), "blank AsAtDate must be omitted: {params:?}");
}

#[test]
fn name_selects_one_scenario() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/passing"), "--name", "View scopes", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
    let report = json_stdout(&output);
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(report["scenarios"][0]["name"], "View scopes");
}

#[test]
fn unknown_name_is_usage_error() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/passing"), "--name", "View valuations"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("error: no scenario named 'View valuations'"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn mismatch_exits_four_with_listing() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/failing/stale_holdings.scenario.toml"), "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4), "stderr:\n{}", stderr(&output));

    let err = stderr(&output);
    assert!(err.contains("FAIL  Stale holdings"), "{err}");
    assert!(err.contains("key \"LUID_00003D58\": field 'Units' observed 260, expected 250"), "{err}");

    let report = json_stdout(&output);
    let stale = scenario(&report, "Stale holdings");
    assert_eq!(stale["outcome"], "failed");
    assert_eq!(stale["status"], "mismatch");
    assert_eq!(stale["report"]["status"], "mismatched");
    let discrepancies = stale["report"]["discrepancies"].as_array().unwrap();
    assert_eq!(discrepancies.len(), 1);
    assert_eq!(discrepancies[0]["field"], "Units");
    assert_eq!(discrepancies[0]["observed"], 260.0);
    assert_eq!(discrepancies[0]["expected"], 250.0);
}

#[test]
fn empty_range_is_not_a_pass() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/failing/empty_range.scenario.toml")])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains("no data in range C2:C20 of sheet 'View scopes' in book 'ibor'"), "{err}");
}

#[test]
fn unknown_call_is_config_error() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/failing/unknown_call.scenario.toml")])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let err = stderr(&output);
    assert!(err.contains("FAIL  unknown_call: "), "{err}");
    assert_eq!(err.matches("unknown_call.scenario.toml").count(), 1, "{err}");
    assert!(err.contains("valuations"), "{err}");
}

#[test]
fn failures_are_independent_and_worst_code_wins() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/failing"), &fixture("scenarios/passing"), "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4), "stderr:\n{}", stderr(&output));

    let report = json_stdout(&output);
    assert_eq!(report["summary"]["total"], 8);
    assert_eq!(report["summary"]["passed"], 4);
    assert_eq!(report["summary"]["failed"], 3);
    assert_eq!(report["summary"]["skipped"], 1);
}

#[test]
fn output_file_receives_report() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.json");
    let output = gridcheck()
        .args(["run", &fixture("scenarios/passing"), "--output", out.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
    assert!(output.stdout.is_empty());

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["summary"]["passed"], 4);
}

#[test]
fn missing_credentials_is_runtime_error() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/live"), "--secrets", &fixture("no-such-secrets.json")])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
    let err = stderr(&output);
    assert!(err.contains("FAIL  Live scopes"), "{err}");
    assert!(err.contains("no-such-secrets.json"), "{err}");
}

#[test]
fn fixtures_flag_replaces_http() {
    let output = gridcheck()
        .args(["run", &fixture("scenarios/live"), "--fixtures", &fixture("api")])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));

    let output = gridcheck()
        .args(["run", &fixture("scenarios/live")])
        .env("GRIDCHECK_FIXTURES", fixture("api"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
}

#[test]
fn missing_path_is_usage_error() {
    let output = gridcheck().args(["run", &fixture("scenarios/nowhere")]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// validate / list
// ===========================================================================

#[test]
fn validate_reports_worst_config_error() {
    let output = gridcheck().args(["validate", &fixture("scenarios/passing")]).output().unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
    assert!(stderr(&output).contains("5 scenario(s) valid"));

    let output = gridcheck().args(["validate", &fixture("scenarios/failing")]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("unknown_call.scenario.toml"));
}

#[test]
fn list_json() {
    let output = gridcheck()
        .args(["list", &fixture("scenarios/passing"), "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
    let entries = json_stdout(&output);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 5);
    let skipped = entries.iter().find(|e| e["name"] == "Perform a reconciliation").unwrap();
    assert_eq!(skipped["call"], "reconciliation");
    assert_eq!(skipped["skip"], "not fully implemented");
    let holdings = entries.iter().find(|e| e["name"] == "View holdings").unwrap();
    assert_eq!(holdings["mode"], "containment");
    assert!(holdings.get("skip").is_none());
}
