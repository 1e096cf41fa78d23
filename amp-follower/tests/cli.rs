//! End-to-end tests of the amp-follower binary against a mock plug

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use mockito::{Matcher, Mock, Server, ServerGuard};
use tempfile::TempDir;

fn write_config(dir: &TempDir, plug_address: &str, extra: &str) -> PathBuf {
    let path = dir.path().join("config.json");
    let json = format!(
        r#"{{
            "target_device": "Speakers",
            "plug_address": "{}",
            "plug_username": "admin",
            "plug_password": "hunter2"{}
        }}"#,
        plug_address, extra
    );
    fs::write(&path, json).unwrap();
    path
}

fn amp_follower(config: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_amp-follower"))
        .arg("--config")
        .arg(config)
        .args(["--log", "silent"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn command(cmnd: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("user".into(), "admin".into()),
        Matcher::UrlEncoded("password".into(), "hunter2".into()),
        Matcher::UrlEncoded("cmnd".into(), cmnd.into()),
    ])
}

fn reply(server: &mut ServerGuard, cmnd: &str, body: &str) -> Mock {
    server
        .mock("GET", "/cm")
        .match_query(command(cmnd))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
}

#[test]
fn test_check_prints_effective_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "192.168.1.40", r#", "cooldown_secs": 3"#);

    let output = amp_follower(&config, &["check"], "");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Speakers"));
    assert!(stdout.contains("192.168.1.40"));
    assert!(stdout.contains("3s"));
    assert!(!stdout.contains("hunter2"));
}

#[test]
fn test_invalid_config_fails_naming_the_field() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "192.168.1.40", r#", "max_volume": 2.0"#);

    let output = amp_follower(&config, &["check"], "");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_volume"));
}

#[test]
fn test_status_reports_power_state() {
    let mut server = Server::new();
    let login = reply(&mut server, "Power", r#"{"POWER":"ON"}"#).create();

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server.host_with_port(), "");

    let output = amp_follower(&config, &["status"], "");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "on");
    login.assert();
}

#[test]
fn test_switch_on() {
    let mut server = Server::new();
    let login = reply(&mut server, "Power", r#"{"POWER":"OFF"}"#).create();
    let switch = reply(&mut server, "Power On", r#"{"POWER":"ON"}"#).create();

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server.host_with_port(), "");

    let output = amp_follower(&config, &["switch", "on"], "");
    assert!(output.status.success());
    login.assert();
    switch.assert();
}

#[test]
fn test_run_turns_plug_off_at_start_and_on_exit() {
    let mut server = Server::new();
    let login = reply(&mut server, "Power", r#"{"POWER":"OFF"}"#)
        .expect(2)
        .create();
    let off = reply(&mut server, "Power Off", r#"{"POWER":"OFF"}"#)
        .expect(2)
        .create();
    let on = reply(&mut server, "Power On", r#"{"POWER":"ON"}"#)
        .expect(0)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server.host_with_port(), "");

    // No input: initial reconcile, then end of input disposes
    let output = amp_follower(&config, &["run", "--source", "stdin"], "");
    assert!(output.status.success());

    login.assert();
    off.assert();
    on.assert();
}

#[test]
fn test_run_with_unreachable_plug_still_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "127.0.0.1:1", r#", "timeout_secs": 1"#);

    let output = amp_follower(&config, &[], "Speakers\n");
    assert!(output.status.success());
}
