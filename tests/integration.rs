use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn hopelog_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("hopelog");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // LLM and embeddings stay disabled: every AI touchpoint has an
    // offline degradation path, so the CLI must work end to end without
    // any provider configured.
    let config_content = format!(
        r#"[db]
path = "{}/data/hopelog.sqlite"

[server]
bind = "127.0.0.1:7411"
"#,
        root.display()
    );

    let config_path = config_dir.join("hopelog.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_hopelog(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = hopelog_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run hopelog binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Parse the id out of "Created user sam (7c9e...)".
fn parse_user_id(stdout: &str) -> String {
    let start = stdout.find('(').expect("no id in output") + 1;
    let end = stdout.find(')').expect("no id in output");
    stdout[start..end].to_string()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_hopelog(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_hopelog(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_hopelog(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_user_add_and_journal_add() {
    let (_tmp, config_path) = setup_test_env();
    run_hopelog(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_hopelog(&config_path, &["user", "add", "sam", "sam@example.com"]);
    assert!(
        success,
        "user add failed: stdout={}, stderr={}",
        stdout, stderr
    );
    let user_id = parse_user_id(&stdout);

    let (stdout, stderr, success) = run_hopelog(
        &config_path,
        &["journal", "add", &user_id, "slept badly, want to fix my sleep"],
    );
    assert!(
        success,
        "journal add failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("Saved entry"));
}

#[test]
fn test_journal_add_unknown_user_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_hopelog(&config_path, &["init"]);

    let (_, stderr, success) =
        run_hopelog(&config_path, &["journal", "add", "nobody", "some text"]);
    assert!(!success);
    assert!(stderr.contains("no user"));
}

#[test]
fn test_process_user_offline() {
    let (_tmp, config_path) = setup_test_env();
    run_hopelog(&config_path, &["init"]);

    let (stdout, _, _) = run_hopelog(&config_path, &["user", "add", "sam", "sam@example.com"]);
    let user_id = parse_user_id(&stdout);

    run_hopelog(&config_path, &["journal", "add", &user_id, "first entry"]);
    run_hopelog(&config_path, &["journal", "add", &user_id, "second entry"]);

    // With the LLM disabled, generation yields nothing, but the batch
    // still completes and reports zero creations.
    let (stdout, stderr, success) =
        run_hopelog(&config_path, &["process", "user", &user_id]);
    assert!(
        success,
        "process failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("0 goals, 0 tasks, 0 habits created"));
}

#[test]
fn test_process_all_offline() {
    let (_tmp, config_path) = setup_test_env();
    run_hopelog(&config_path, &["init"]);

    let (stdout, _, _) = run_hopelog(&config_path, &["user", "add", "sam", "sam@example.com"]);
    let user_id = parse_user_id(&stdout);
    run_hopelog(&config_path, &["journal", "add", &user_id, "an entry"]);

    let (stdout, stderr, success) = run_hopelog(&config_path, &["process", "all"]);
    assert!(
        success,
        "process all failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("Batch run complete"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("does-not-exist.toml");

    let (_, stderr, success) = run_hopelog(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("config"));
}
