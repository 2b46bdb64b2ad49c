//! Integration tests for the `corral` binary entry point.
//!
//! Verifies exit codes and the split between script output on stdout and
//! diagnostics on stderr.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn confined_script_succeeds() {
    let root = TempDir::new().expect("create temp dir");
    let mut command = cargo_bin_cmd!("corral");
    command
        .args(["--log-filter", "off", "--root"])
        .arg(root.path())
        .args(["-c", "mkdir test && ls"]);
    command.assert().success().stdout("test\n");
    assert!(root.path().join("test").is_dir());
}

#[test]
fn escaping_script_fails() {
    let root = TempDir::new().expect("create temp dir");
    let mut command = cargo_bin_cmd!("corral");
    command
        .args(["--log-filter", "off", "--root"])
        .arg(root.path())
        .args(["-c", "rm -rf /"]);
    command
        .assert()
        .failure()
        .code(1)
        .stderr(contains("outside the sandbox root"));
}

#[test]
fn missing_script_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("corral");
    command.assert().failure().code(2);
}

#[test]
fn script_is_read_from_piped_stdin() {
    let root = TempDir::new().expect("create temp dir");
    let mut command = cargo_bin_cmd!("corral");
    command
        .args(["--log-filter", "off", "--root"])
        .arg(root.path())
        .arg("-")
        .write_stdin("echo piped\n");
    command.assert().success().stdout("piped\n");
}
