//! End-to-end runs of the `clearance` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    audit: PathBuf,
    config: PathBuf,
}

fn workspace(asynchronous: bool) -> Workspace {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let audit = dir.path().join("audit.jsonl");
    let config = dir.path().join("config.toml");
    let toml = format!(
        "[audit]\npath = {audit:?}\nasynchronous = {asynchronous}\n\n\
         [credentials]\niterations = 1000\nsalt_len = 16\n\n\
         [logging]\nlevel = \"warn\"\n",
        audit = audit.display().to_string(),
    );
    fs::write(&config, toml).expect("write config");
    Workspace { dir, audit, config }
}

fn clearance(ws: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("clearance").expect("binary should build");
    cmd.current_dir(ws.dir.path())
        .env_remove("RUST_LOG")
        .env_remove("CLEARANCE_AUDIT_LOG")
        .env_remove("CLEARANCE_KDF_ITERATIONS")
        .env_remove("CLEARANCE_LOG_LEVEL")
        .arg("--config")
        .arg(&ws.config);
    cmd
}

fn write_script(ws: &Workspace, body: &str) -> PathBuf {
    let path = ws.dir.path().join("script.jsonl");
    fs::write(&path, body).expect("write script");
    path
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .expect("read audit log")
        .lines()
        .count()
}

const SCENARIO: &str = r#"# alice owns a CONFIDENTIAL object; bob lacks the category
{"op":"register","id":"alice","password":"pw","level":"SECRET","categories":["CATEGORY1"]}
{"op":"create_object","actor":"alice","name":"o1","content":"v1","level":"CONFIDENTIAL","categories":["CATEGORY1"]}
{"op":"register","id":"bob","password":"pw","level":1}
{"op":"read_object","actor":"bob","name":"o1"}
{"op":"update_object","actor":"alice","name":"o1","content":"v2"}
{"op":"read_object","actor":"alice","name":"o1"}
{"op":"authenticate","id":"alice","password":"nope"}
"#;

fn run_scenario(asynchronous: bool) {
    let ws = workspace(asynchronous);
    let script = write_script(&ws, SCENARIO);
    let output = clearance(&ws)
        .arg("run")
        .arg(&script)
        .output()
        .expect("run binary");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json result line"))
        .collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0]["result"], "registered");
    assert_eq!(lines[1]["result"], "created");
    assert_eq!(lines[3]["error"], "missing_categories");
    assert_eq!(lines[4]["error"], "level_mismatch");
    assert_eq!(lines[5]["result"], "content");
    assert_eq!(lines[5]["content"], "v1");
    assert_eq!(lines[6]["error"], "unauthorized");

    assert_eq!(line_count(&ws.audit), 7);
}

#[test]
fn run_prints_results_and_writes_audit_trail() {
    run_scenario(true);
}

#[test]
fn run_with_inline_audit_writes() {
    run_scenario(false);
}

#[test]
fn check_accepts_valid_script() {
    let ws = workspace(false);
    let script = write_script(&ws, SCENARIO);
    clearance(&ws)
        .arg("check")
        .arg(&script)
        .assert()
        .success()
        .stdout("7 requests OK\n");
    assert!(!ws.audit.exists(), "check must not touch the audit trail");
}

#[test]
fn check_rejects_unknown_category() {
    let ws = workspace(false);
    let script = write_script(
        &ws,
        r#"{"op":"register","id":"carol","password":"pw","level":"SECRET","categories":["CATEGORY9"]}"#,
    );
    let output = clearance(&ws)
        .arg("check")
        .arg(&script)
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("request 1:"), "stdout: {stdout}");
}

#[test]
fn hash_password_reads_stdin() {
    let ws = workspace(false);
    let output = clearance(&ws)
        .arg("hash-password")
        .write_stdin("correct horse\n")
        .output()
        .expect("run binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("pbkdf2-sha256$1000$"), "stdout: {stdout}");
    assert!(!stdout.contains("correct horse"));
}

#[test]
fn hash_password_rejects_empty_input() {
    let ws = workspace(false);
    clearance(&ws)
        .arg("hash-password")
        .write_stdin("\n")
        .assert()
        .failure();
}
