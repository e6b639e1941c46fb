use std::process::Command;

fn linenote(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_linenote"));
    cmd.current_dir(dir)
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_REF");
    cmd
}

#[test]
fn run_rejects_malformed_pr_reference() {
    let dir = tempfile::tempdir().unwrap();

    let output = linenote(dir.path())
        .args(["run", "--pr", "not-a-reference", "a.py"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected owner/repo#number"), "stderr: {stderr}");
}

#[test]
fn run_without_pr_outside_actions_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = linenote(dir.path()).args(["run", "a.py"]).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No pull request given"), "stderr: {stderr}");
}

#[test]
fn run_reports_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".linenote.toml"),
        "[analyzer]\nmax_output_bytes = 0\n",
    )
    .unwrap();

    let output = linenote(dir.path())
        .args(["run", "--pr", "o/r#1", "a.py"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_output_bytes"), "stderr: {stderr}");
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = linenote(dir.path())
        .args(["--config", "nope.toml", "run", "--pr", "o/r#1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
fn completions_generate_script() {
    let dir = tempfile::tempdir().unwrap();

    let output = linenote(dir.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("linenote"));
}
