use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

fn frameweave() -> Command {
    let mut cmd = Command::cargo_bin("frameweave").expect("binary built");
    for key in [
        "HEADLESS",
        "VIEWPORT",
        "NAVIGATION_TIMEOUT",
        "SELECTOR_TIMEOUT",
        "TYPING_DELAY",
        "DROPDOWN_ITEM_SELECTOR",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn config_show_prints_effective_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frameweave.yaml");
    fs::write(&path, "timeouts:\n  selector_ms: 9000\n").unwrap();

    let assert = frameweave()
        .current_dir(dir.path())
        .env("TYPING_DELAY", "15")
        .args(["--config", path.to_str().unwrap(), "config", "show"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    assert!(stdout.contains("selector_ms: 9000"), "{stdout}");
    assert!(stdout.contains("typing_delay_ms: 15"), "{stdout}");
}

#[test]
fn invalid_environment_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    frameweave()
        .current_dir(dir.path())
        .env("VIEWPORT", "0x0")
        .args(["config", "validate"])
        .assert()
        .failure();
}
