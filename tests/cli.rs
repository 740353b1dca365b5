//! Offline commands of the cranectl binary

use std::process::Command;

#[test]
fn crds_writes_one_file_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_cranectl"))
        .args(["crds", "--quiet", "--out-dir"])
        .arg(dir.path())
        .env("HOME", dir.path())
        .output()
        .expect("Failed to run cranectl");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let files = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "yaml"))
        .count();
    assert_eq!(files, 17);
    assert!(dir.path().join("autoscaling.crane.io_effectivehorizontalpodautoscalers.yaml").exists());
}

#[test]
fn crds_to_stdout() {
    let home = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_cranectl"))
        .args(["crds", "-q"])
        .env("HOME", home.path())
        .output()
        .expect("Failed to run cranectl");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("kind: CustomResourceDefinition").count(), 17);
    assert!(stdout.contains("name: cloudcarbonfootprints.co2e.gocrane.io"));
}

#[test]
fn unknown_kind_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_cranectl"))
        .args(["list", "deployments"])
        .env("HOME", home.path())
        .output()
        .expect("Failed to run cranectl");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown resource kind"));
}
