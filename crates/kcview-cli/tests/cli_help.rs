use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("kcview")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tui"))
        .stdout(predicate::str::contains("call"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_call_help_shows_token_flag() {
    cargo_bin_cmd!("kcview")
        .args(["call", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<ENDPOINT>"))
        .stdout(predicate::str::contains("--token"));
}

#[test]
fn test_call_requires_endpoint() {
    cargo_bin_cmd!("kcview")
        .arg("call")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ENDPOINT>"));
}

#[test]
fn test_serve_help_shows_bind() {
    cargo_bin_cmd!("kcview")
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}
