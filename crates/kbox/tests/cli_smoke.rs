#![cfg(feature = "cli")]

use std::process::Command;

fn kbox() -> Command {
    Command::new(env!("CARGO_BIN_EXE_kbox"))
}

#[test]
fn version_prints_crate_version() {
    let output = kbox().arg("version").output().expect("binary should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("kbox {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_lists_features() {
    let output = kbox()
        .args(["version", "--extended"])
        .output()
        .expect("binary should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: kbox"));
    assert!(stdout.contains("cli=true"));
}

#[test]
fn missing_port_is_a_usage_error() {
    let output = kbox()
        .arg("ping")
        .env_remove("KBOX_PORT")
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--port"));
}

#[test]
fn absent_port_fails_to_open() {
    let output = kbox()
        .args(["--port", "/dev/kbox-port-that-does-not-exist", "reboot"])
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("open failed"));
}

#[test]
fn zero_timeout_is_rejected() {
    let output = kbox()
        .args(["--port", "/dev/null", "--timeout", "0ms", "logs"])
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(64));
}
