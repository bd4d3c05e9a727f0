#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ff(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ff").unwrap();
    cmd.current_dir(dir.path())
        .env("FF_CONFIG_DIR", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn read_config(dir: &TempDir) -> serde_json::Value {
    let raw = std::fs::read_to_string(dir.path().join("jenkins.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ---------------------------------------------------------------------------
// ff jenkins config
// ---------------------------------------------------------------------------

#[test]
fn config_path_points_into_config_dir() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jenkins.json"));
}

#[test]
fn config_show_without_file_fails() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn config_set_persists_camel_case_fields() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args([
            "jenkins",
            "config",
            "set",
            "--port",
            "9100",
            "--secret",
            "abc123",
            "--allow-ip",
            "10.0.0.",
            "--auto-test",
            "true",
            "--test-command",
            "npm test",
        ])
        .assert()
        .success();

    let json = read_config(&dir);
    assert_eq!(json["port"], 9100);
    assert_eq!(json["secret"], "abc123");
    assert_eq!(json["allowedIPs"][0], "10.0.0.");
    assert_eq!(json["autoTest"], true);
    assert_eq!(json["testCommand"], "npm test");
}

#[test]
fn config_set_keeps_unspecified_fields() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "config", "set", "--port", "9100", "--secret", "abc123"])
        .assert()
        .success();
    ff(&dir)
        .args(["jenkins", "config", "set", "--port", "9200"])
        .assert()
        .success();

    let json = read_config(&dir);
    assert_eq!(json["port"], 9200);
    assert_eq!(json["secret"], "abc123");
}

#[test]
fn config_set_empty_secret_disables_token_auth() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "config", "set", "--secret", "abc123"])
        .assert()
        .success();
    ff(&dir)
        .args(["jenkins", "config", "set", "--secret", ""])
        .assert()
        .success();

    assert!(read_config(&dir).get("secret").is_none());
}

#[test]
fn config_show_json_round_trips_saved_values() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "config", "set", "--port", "9300"])
        .assert()
        .success();

    let output = ff(&dir)
        .args(["--json", "jenkins", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["port"], 9300);
    assert_eq!(json["autoTest"], false);
}

#[test]
fn config_show_hides_secret_value() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "config", "set", "--secret", "abc123"])
        .assert()
        .success();
    ff(&dir)
        .args(["jenkins", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(set)"))
        .stdout(predicate::str::contains("abc123").not());
}

#[test]
fn config_show_json_redacts_credentials() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "config", "set", "--secret", "abc123", "--api-token", "tok-999"])
        .assert()
        .success();

    let output = ff(&dir)
        .args(["--json", "jenkins", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("abc123"), "{stdout}");
    assert!(!stdout.contains("tok-999"), "{stdout}");
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["secret"], "(set)");
    assert_eq!(json["apiToken"], "(set)");
}

#[test]
fn config_validate_reports_warnings_but_succeeds() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("jenkins.json"),
        r#"{ "port": 9000, "autoTest": true }"#,
    )
    .unwrap();
    ff(&dir)
        .args(["jenkins", "config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[warning]"));
}

#[test]
fn config_validate_fails_on_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("jenkins.json"),
        r#"{ "port": 9000, "allowedIPs": [""] }"#,
    )
    .unwrap();
    ff(&dir)
        .args(["jenkins", "config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("jenkins.json"), "{ not json").unwrap();
    ff(&dir)
        .args(["jenkins", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

// ---------------------------------------------------------------------------
// ff jenkins status / listen
// ---------------------------------------------------------------------------

#[test]
fn status_without_jenkins_url_fails() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "status", "web-app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("jenkins url not configured"));
}

#[test]
fn listen_on_occupied_port_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = blocker.local_addr().unwrap().port().to_string();

    ff(&dir)
        .args(["jenkins", "listen", "--port", &port])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to start Jenkins listener"));
}

#[test]
fn listen_save_writes_effective_config_before_starting() {
    let dir = TempDir::new().unwrap();
    let blocker = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    ff(&dir)
        .args(["jenkins", "listen", "--save", "--secret", "s3"])
        .args(["--port", &port.to_string()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Configuration saved"));

    let json = read_config(&dir);
    assert_eq!(json["port"], port);
    assert_eq!(json["secret"], "s3");
}

#[test]
fn help_lists_jenkins_commands() {
    let dir = TempDir::new().unwrap();
    ff(&dir)
        .args(["jenkins", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("listen"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("status"));
}
