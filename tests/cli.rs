//! End-to-end tests of the harness binary against scripted fake targets.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn shellprobe_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_shellprobe"))
}

/// Enough of `smash` for the showpid cases.
const FAKE_SMASH: &str = r#"
set -f
while IFS= read -r line; do
  printf 'smash > '
  set -- $line
  case "$1" in
    showpid)
      if [ $# -gt 1 ]; then echo "smash error: showpid: expected 0 arguments" >&2; else echo "smash pid is $$"; fi ;;
    quit)
      exit 0 ;;
  esac
done
"#;

/// Write `body` as a target script plus a config that runs it through
/// `/bin/sh`. Returns the config path.
fn fake_config(dir: &Path, body: &str) -> PathBuf {
    let script = dir.join("smash.sh");
    fs::write(&script, body).unwrap();
    let config = dir.join("shellprobe.yaml");
    fs::write(
        &config,
        format!("target: /bin/sh\nargs: [\"{}\"]\ntimeout: 5\n", script.display()),
    )
    .unwrap();
    config
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_missing_target_runs_nothing() {
    let output = shellprobe_cmd()
        .args(["--target", "/nonexistent/smash"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("target executable not found at /nonexistent/smash"), "{out}");
    assert!(out.contains("No test cases were run."), "{out}");
    assert!(!out.contains("[PASS]"));
    assert!(!out.contains("[FAIL]"));
}

#[test]
fn test_filtered_run_passes() {
    let temp_dir = TempDir::new().unwrap();
    let config = fake_config(temp_dir.path(), FAKE_SMASH);

    let output = shellprobe_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--filter", "showpid"])
        .output()
        .unwrap();

    let out = stdout(&output);
    assert!(
        output.status.success(),
        "stdout: {out}\nstderr: {}",
        stderr(&output)
    );
    assert!(out.contains("Module Tests"));
    assert!(out.contains("  [PASS] showpid\n"));
    assert!(out.contains("  [PASS] showpid_with_args\n"));
    assert!(!out.contains("System Tests"));
    assert!(out.contains("  Total:  2"));
    assert!(out.contains("All tests passed!"));
}

#[test]
fn test_failing_case_sets_exit_status() {
    let temp_dir = TempDir::new().unwrap();
    let config = fake_config(temp_dir.path(), "cat > /dev/null\n");

    let output = shellprobe_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--filter", "showpid"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("  [FAIL] showpid\n"), "{out}");
    assert!(out.contains("      Expected: smash pid is <PID>"));
    assert!(out.contains("  Failed: 2"));
    assert!(out.contains("Some tests failed. Please review the output above."));
}

#[test]
fn test_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let config = fake_config(temp_dir.path(), FAKE_SMASH);

    let output = shellprobe_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--filter", "showpid", "--output", "json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["passed"], 2);
    assert_eq!(json["failed"], 0);
    assert_eq!(json["categories"][0]["name"], "Module Tests");
    assert_eq!(json["categories"][0]["cases"][0]["name"], "showpid");
    assert_eq!(json["categories"][0]["cases"][0]["status"], "pass");
}

#[test]
fn test_junit_output_for_setup_failure() {
    let output = shellprobe_cmd()
        .args(["--target", "/nonexistent/smash", "--output", "junit"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let xml = stdout(&output);
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<testsuite name=\"setup\""));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("shellprobe.yaml");
    fs::write(&config, "timeout: [not a number").unwrap();

    let output = shellprobe_cmd().arg("--config").arg(&config).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error loading config"));
}

#[test]
fn test_list_prints_catalog() {
    let output = shellprobe_cmd().arg("list").output().unwrap();

    assert!(output.status.success());
    let out = stdout(&output);
    let module = out.find("Module Tests").unwrap();
    let system = out.find("System Tests").unwrap();
    let stress = out.find("Stress Tests").unwrap();
    assert!(module < system && system < stress);
    assert!(out.contains("\n  showpid\n"));
    assert!(out.contains("\n  job_id_reuse\n"));
    assert!(out.contains("\n  garbage_collector_with_sleep\n"));
}

#[test]
fn test_schema_is_json() {
    let output = shellprobe_cmd().arg("schema").output().unwrap();

    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(schema["properties"]["target"].is_object());
    assert!(schema["properties"]["shutdown_kill"].is_object());
}
