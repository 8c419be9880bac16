//! CLI integration tests.
//!
//! Each test points `ST_DATA_DIR` at a fresh temp directory, so the
//! file-backed store and snapshot slots are fully isolated per test.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use st::store::{ConfigStore, ConfigValue, FileStore};

fn st(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("st").unwrap();
    cmd.env("ST_DATA_DIR", dir.path());
    cmd
}

fn store(dir: &TempDir) -> FileStore {
    FileStore::open(dir.path().join("store.json"))
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_prints_quick_start() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("st list"));
}

#[test]
fn test_list_shows_builtin_tweaks() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("gaming.game-dvr-off"))
        .stdout(predicate::str::contains("privacy.telemetry-off"));
}

#[test]
fn test_list_robot_emits_json() {
    let dir = TempDir::new().unwrap();
    let output = st(&dir)
        .args(["list", "--robot"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let ids: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"power.high-performance"));
}

#[test]
fn test_list_filters_by_category() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .args(["list", "--category", "power"])
        .assert()
        .success()
        .stdout(predicate::str::contains("power.hibernate-off"))
        .stdout(predicate::str::contains("gaming").not());
}

#[test]
fn test_show_unknown_tweak_fails_with_hint() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .args(["show", "gaming.does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown tweak"))
        .stderr(predicate::str::contains("st list"));
}

#[test]
fn test_apply_then_restore_round_trip() {
    let dir = TempDir::new().unwrap();

    st(&dir)
        .args(["apply", "gaming.game-dvr-off"])
        .assert()
        .success()
        .stdout(predicate::str::contains("applied 1 tweak"));

    // The mutation landed in the file-backed store.
    assert_eq!(
        store(&dir)
            .read("HKCU\\System\\GameConfigStore", "GameDVR_Enabled")
            .unwrap(),
        Some(ConfigValue::Int32(0))
    );

    st(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("gaming").and(predicate::str::contains("backup from")));

    st(&dir).arg("restore").assert().success();

    // The value did not exist before the apply; restore removed it.
    assert_eq!(
        store(&dir)
            .read("HKCU\\System\\GameConfigStore", "GameDVR_Enabled")
            .unwrap(),
        None
    );
}

#[test]
fn test_apply_preexisting_value_is_restored() {
    let dir = TempDir::new().unwrap();
    store(&dir)
        .write(
            "HKLM\\SYSTEM\\CurrentControlSet\\Control\\Power",
            "HibernateEnabled",
            &ConfigValue::Int32(1),
        )
        .unwrap();

    st(&dir).args(["apply", "power.hibernate-off"]).assert().success();
    assert_eq!(
        store(&dir)
            .read(
                "HKLM\\SYSTEM\\CurrentControlSet\\Control\\Power",
                "HibernateEnabled"
            )
            .unwrap(),
        Some(ConfigValue::Int32(0))
    );

    st(&dir)
        .args(["restore", "--category", "power"])
        .assert()
        .success();
    assert_eq!(
        store(&dir)
            .read(
                "HKLM\\SYSTEM\\CurrentControlSet\\Control\\Power",
                "HibernateEnabled"
            )
            .unwrap(),
        Some(ConfigValue::Int32(1))
    );
}

#[test]
fn test_restore_without_backup_succeeds() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .arg("restore")
        .assert()
        .success()
        .stdout(predicate::str::contains("no backup"));
}

#[test]
fn test_status_robot_reports_backups() {
    let dir = TempDir::new().unwrap();
    st(&dir).args(["apply", "privacy.advertising-id-off"]).assert().success();

    let output = st(&dir)
        .args(["status", "--robot"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let privacy = parsed
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["category"] == "privacy")
        .unwrap();
    assert_eq!(privacy["has_backup"], true);
    assert_eq!(privacy["backup_entries"], 1);
}

#[test]
fn test_startup_disable_and_enable() {
    let dir = TempDir::new().unwrap();
    store(&dir)
        .write(
            "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Run",
            "Updater",
            &ConfigValue::String("C:\\Tools\\updater.exe".into()),
        )
        .unwrap();

    st(&dir)
        .args(["startup", "disable", "Updater"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updater"));

    st(&dir)
        .args(["startup", "status", "Updater"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));

    st(&dir).args(["startup", "enable", "Updater"]).assert().success();
    st(&dir)
        .args(["startup", "status", "Updater"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled"));
}

#[test]
fn test_startup_disable_unknown_item_reports_failure() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .args(["startup", "disable", "Ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed").and(predicate::str::contains("Ghost")));
}

#[test]
fn test_completions_generate() {
    let dir = TempDir::new().unwrap();
    st(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_st"));
}
