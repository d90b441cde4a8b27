//! Integration tests for API Box CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn sample_config() -> String {
    format!("{}/../config/apibox.toml", env!("CARGO_MANIFEST_DIR"))
}

fn apibox() -> Command {
    Command::cargo_bin("apibox").unwrap()
}

/// Test the version command
#[test]
fn test_cli_version() {
    apibox()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("apibox"));
}

/// Test the help command
#[test]
fn test_cli_help() {
    apibox()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("route authorization"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("routes"))
        .stdout(predicate::str::contains("benchmark"));
}

#[test]
fn test_check_allowed() {
    apibox()
        .args(["check", "--config", &sample_config(), "--remote", "basic_remote"])
        .arg("users/123/profile")
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOWED"));
}

#[test]
fn test_check_global_denial() {
    apibox()
        .args(["check", "--config", &sample_config(), "--remote", "basic_remote"])
        .arg("users/123/delete")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("DENIED"))
        .stdout(predicate::str::contains("users/{{}}/delete"));
}

#[test]
fn test_check_whitelist_json() {
    apibox()
        .args(["check", "--config", &sample_config(), "--remote", "allowed_routes_remote"])
        .args(["users/123/settings", "--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"allowed\": false"))
        .stdout(predicate::str::contains("DENY_NOT_WHITELISTED"));
}

#[test]
fn test_check_unknown_remote() {
    apibox()
        .args(["check", "--config", &sample_config(), "--remote", "nonexistent_remote"])
        .arg("users")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_check_missing_remote_arg() {
    apibox()
        .args(["check", "--config", &sample_config(), "users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_resolve_remapped_route() {
    apibox()
        .args(["resolve", "--config", &sample_config(), "--remote", "custom_mapping_remote"])
        .arg("users/123/permissions")
        .assert()
        .success()
        .stdout(predicate::str::contains("user-permissions/123"))
        .stdout(predicate::str::contains("http://localhost:9002/user-permissions/123"))
        .stdout(predicate::str::contains("user_id = 123"));
}

#[test]
fn test_resolve_passthrough() {
    apibox()
        .args(["resolve", "--config", &sample_config(), "--remote", "remote_4321"])
        .args(["--method", "post", "orders/9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(passthrough)"))
        .stdout(predicate::str::contains("POST"));
}

#[test]
fn test_resolve_denied() {
    apibox()
        .args(["resolve", "--config", &sample_config(), "--remote", "restricted_remote"])
        .arg("admin")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not allowed"));
}

#[test]
fn test_validate_sample_config() {
    apibox()
        .args(["validate", &sample_config()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Remotes: 6"))
        .stdout(predicate::str::contains("allowed_routes_remote (whitelist"));
}

#[test]
fn test_validate_bad_pattern() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[remotes.broken]
restricted_routes = ["users/{{{{id"]
"#
    )
    .unwrap();

    apibox()
        .args(["validate", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Configuration is invalid"))
        .stdout(predicate::str::contains("unterminated"));
}

#[test]
fn test_validate_missing_route_key() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[remotes.broken]
routes = [{{ method = "post" }}]
"#
    )
    .unwrap();

    apibox()
        .args(["validate", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("route"));
}

#[test]
fn test_validate_nonexistent_file() {
    apibox()
        .args(["validate", "/nonexistent/apibox.toml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn test_routes_single_remote() {
    apibox()
        .args(["routes", "--config", &sample_config(), "--remote", "custom_mapping_remote"])
        .assert()
        .success()
        .stdout(predicate::str::contains("users/{{}}/delete"))
        .stdout(predicate::str::contains(
            "GET users/{{user_id}}/permissions → user-permissions/{{user_id}}",
        ))
        .stdout(predicate::str::contains("POST users/{{user_id}}"))
        .stdout(predicate::str::contains("restricted_remote").not());
}

#[test]
fn test_routes_unknown_remote() {
    apibox()
        .args(["routes", "--config", &sample_config(), "--remote", "ghost"])
        .assert()
        .code(2);
}

#[test]
fn test_benchmark_small() {
    apibox()
        .args(["benchmark", "--config", &sample_config()])
        .args(["--requests", "200", "--threads", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark Results"))
        .stdout(predicate::str::contains("Total requests: 200"));
}
