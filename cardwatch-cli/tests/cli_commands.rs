//! End-to-end tests for the `cardwatch` binary.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;
use std::thread;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn cardwatch(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cardwatch"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("CARDWATCH_API_BASE")
        .arg("--config")
        .arg(home.join("cfg"))
        .arg("--style")
        .arg(home.join("style"))
        .arg("--output")
        .arg(home.join("out"));
    cmd
}

fn config_json(home: &Path) -> serde_json::Value {
    let text = fs::read_to_string(home.join("cfg/config.json")).expect("config.json");
    serde_json::from_str(&text).expect("valid json")
}

/// Answers every request for `/repos/A/B/commits/main` with a commit whose
/// sha is `head`; everything else is a 404.
fn serve_head(head: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            let _ = reader.read_line(&mut request_line);
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
            }
            let (status, body) = if request_line.contains("/repos/A/B/commits/main ") {
                (
                    200,
                    format!(
                        r#"{{"sha":"{head}","commit":{{"message":"feat: hello","author":{{"name":"Yume","date":"2025-05-30T12:00:00Z"}}}}}}"#
                    ),
                )
            } else {
                (404, r#"{"message":"Not Found"}"#.to_string())
            };
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    base
}

// ---------------------------------------------------------------------------
// add / list / set-token
// ---------------------------------------------------------------------------

#[test]
fn add_twice_keeps_one_entry_with_default_branch() {
    let home = TempDir::new().unwrap();

    cardwatch(home.path())
        .args(["add", "A", "B"])
        .assert()
        .success()
        .stdout(contains("subscribed to A/B (main)"));
    cardwatch(home.path())
        .args(["add", "A", "B", "dev"])
        .assert()
        .success()
        .stdout(contains("already subscribed"));

    let config = config_json(home.path());
    let repos = config["GitHub"]["repository"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["branch"], "main");
    assert_eq!(repos[0]["lastsha"], "");
}

#[test]
fn list_shows_entries_and_token_state_without_value() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path()).args(["add", "octo", "cat", "dev"]).assert().success();
    cardwatch(home.path())
        .args(["set-token", "ghp_supersecret"])
        .assert()
        .success();

    cardwatch(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("octo/cat"))
        .stdout(contains("dev"))
        .stdout(contains("token"))
        .stdout(contains("unset").not())
        .stdout(contains("ghp_supersecret").not());
}

#[test]
fn list_json_reports_never_checked_as_null() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path()).args(["add", "A", "B"]).assert().success();

    let output = cardwatch(home.path()).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["token"], false);
    assert_eq!(payload["repositories"][0]["owner"], "A");
    assert!(payload["repositories"][0]["last_revision"].is_null());
}

#[test]
fn list_on_fresh_home_suggests_add() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No repositories subscribed"));
}

#[test]
fn empty_token_is_rejected() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path())
        .args(["set-token", "  "])
        .assert()
        .code(1)
        .stderr(contains("token must not be empty"));
    assert!(!home.path().join("cfg/config.json").exists());
}

#[test]
fn set_token_is_written_to_config() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path()).args(["set-token", "ghp_abc"]).assert().success();
    assert_eq!(config_json(home.path())["GitHub"]["token"], "ghp_abc");
}

// ---------------------------------------------------------------------------
// Argument and storage errors
// ---------------------------------------------------------------------------

#[test]
fn missing_arguments_exit_with_status_one() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path()).args(["add", "onlyowner"]).assert().code(1);
    cardwatch(home.path()).arg("frobnicate").assert().code(1);
}

#[test]
fn corrupt_config_fails_one_shot_commands() {
    let home = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("cfg")).unwrap();
    fs::write(home.path().join("cfg/config.json"), "{ nope").unwrap();

    cardwatch(home.path())
        .arg("list")
        .assert()
        .code(1)
        .stderr(contains("config.json"));
}

#[test]
fn help_exits_zero() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("monitor"));
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_unsubscribed_repository_fails() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path())
        .args(["check", "nobody", "here"])
        .assert()
        .code(1)
        .stderr(contains("not subscribed"));
}

#[test]
fn check_first_time_renders_one_card_and_records_head() {
    let home = TempDir::new().unwrap();
    let base = serve_head("c3c3c3c3c3c3");
    cardwatch(home.path()).args(["add", "A", "B"]).assert().success();

    cardwatch(home.path())
        .args(["--api-base", base.as_str(), "check", "A", "B"])
        .assert()
        .success()
        .stdout(contains("advanced first check"))
        .stdout(contains("A_B_c3c3c3c.html"));

    let card = home.path().join("out/A_B_c3c3c3c.html");
    assert!(card.exists());
    assert!(fs::read_to_string(card).unwrap().contains("feat: hello"));
    assert_eq!(
        config_json(home.path())["GitHub"]["repository"][0]["lastsha"],
        "c3c3c3c3c3c3"
    );

    cardwatch(home.path())
        .args(["--api-base", base.as_str(), "check", "A", "B"])
        .assert()
        .success()
        .stdout(contains("unchanged"));
}

#[test]
fn check_against_missing_remote_reports_failure() {
    let home = TempDir::new().unwrap();
    let base = serve_head("unused");
    cardwatch(home.path()).args(["add", "X", "Y"]).assert().success();

    cardwatch(home.path())
        .args(["--api-base", base.as_str(), "check", "X", "Y"])
        .assert()
        .code(1)
        .stderr(contains("not_found"));
    assert_eq!(config_json(home.path())["GitHub"]["repository"][0]["lastsha"], "");
}

#[cfg(unix)]
#[test]
fn check_logs_render_failures_to_stderr() {
    let home = TempDir::new().unwrap();
    let base = serve_head("d4d4d4d4d4d4");
    cardwatch(home.path()).args(["add", "A", "B"]).assert().success();

    cardwatch(home.path())
        .env_remove("RUST_LOG")
        .args(["--api-base", base.as_str(), "--capture", "false", "check", "A", "B"])
        .assert()
        .success()
        .stdout(contains("advanced first check"))
        .stdout(contains("card render failed").not())
        .stderr(contains("card render failed"))
        .stderr(contains("capture command `false` failed"));
    assert_eq!(
        config_json(home.path())["GitHub"]["repository"][0]["lastsha"],
        "d4d4d4d4d4d4"
    );
}

// ---------------------------------------------------------------------------
// test-card
// ---------------------------------------------------------------------------

#[test]
fn test_card_renders_demo_batch() {
    let home = TempDir::new().unwrap();
    cardwatch(home.path())
        .args(["test-card", "--count", "2"])
        .assert()
        .success()
        .stdout(contains("cardwatch_demo_5eed000.html"))
        .stdout(contains("cardwatch_demo_5eed001.html"));

    let html = fs::read_to_string(home.path().join("out/cardwatch_demo_5eed001.html")).unwrap();
    assert!(html.contains("few-commits"));
    assert!(html.contains("2 / 2"));
}

#[test]
fn test_card_uses_style_override() {
    let home = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("style")).unwrap();
    fs::write(
        home.path().join("style/card.html.tera"),
        "custom {{ repo }} {{ position }}/{{ total }}",
    )
    .unwrap();

    cardwatch(home.path())
        .args(["test-card", "--count", "1"])
        .assert()
        .success();

    let html = fs::read_to_string(home.path().join("out/cardwatch_demo_5eed000.html")).unwrap();
    assert_eq!(html, "custom demo 1/1");
}
