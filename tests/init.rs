use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_linenote"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "linenote init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".linenote.toml");
    assert!(config_path.exists(), ".linenote.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[analyzer]"));
    assert!(content.contains("[comments]"));

    let config: linenote_core::LinenoteConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.analyzer.policy, linenote_core::Policy::Analyzer);
    assert_eq!(config.analyzer.command, "python3");
    assert_eq!(config.comments.marker, "#");
    assert!(linenote_core::LinenoteConfig::from_toml(&content).is_ok());
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".linenote.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_linenote"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".linenote.toml")).unwrap();
    assert_eq!(content, "# existing");
}
