use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("cloud-cost-optimizer").unwrap();
    cmd.env_remove("GCP_PROJECT_ID")
        .env_remove("GCP_ACCESS_TOKEN")
        .env_remove("CCO_LOOKBACK_DAYS")
        .env("LOG_LEVEL", "ERROR");
    cmd
}

#[test]
fn test_help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_scan_without_project_fails() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("empty.toml");
    fs::write(&config_path, "[gcp]\nproject_id = \"\"\n").unwrap();

    cli()
        .current_dir(dir.path())
        .args(["scan", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("project_id"));
}

#[test]
fn test_scan_json_error_shape() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("empty.toml");
    fs::write(&config_path, "").unwrap();

    cli()
        .current_dir(dir.path())
        .args(["scan", "--json", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"error\""));
}

#[test]
fn test_invalid_days_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("project.toml");
    fs::write(&config_path, "[gcp]\nproject_id = \"demo\"\n").unwrap();

    cli()
        .current_dir(dir.path())
        .args(["scan", "--days", "0", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Lookback days"));
}

#[test]
fn test_config_prints_effective_toml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("project.toml");
    fs::write(&config_path, "[gcp]\nproject_id = \"demo\"\n\n[analysis]\nlookback_days = 7\n").unwrap();

    cli()
        .current_dir(dir.path())
        .arg("config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("project_id = \"demo\""))
        .stdout(predicate::str::contains("lookback_days = 7"));
}
