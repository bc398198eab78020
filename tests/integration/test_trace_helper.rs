use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn helper() -> Command {
    let mut cmd = Command::cargo_bin("trace_helper").unwrap();
    for var in ["SESHAT_LOG_FILE", "SESHAT_CONSOLE", "SESHAT_FORWARD_TRACING", "SESHAT_DIAGNOSTICS"] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_logging_scenario_writes_three_levels() {
    helper()
        .args(["--scenario", "logging"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[INFO] [trace_helper] << run_logging >> : Hello world"))
        .stdout(predicate::str::contains(
            "[WARN] [trace_helper] << run_logging >> : This is not going to end well...",
        ))
        .stdout(predicate::str::contains("[ERROR] [trace_helper] << run_logging >> : Told you so"));
}

#[test]
fn test_record_scenario_dumps_args_kwargs_and_return() {
    let output = helper()
        .args(["--scenario", "record"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert!(lines[0].ends_with("[FUNC] [trace_helper] << run_record >> [ run_record >> add() ]"));
    assert_eq!(&lines[1..8], ["args:", "\t(", "\t    2,", "\t    3,", "\t)", "return:", "\t5"]);
    assert!(lines[8].ends_with("[ run_record >> greet() ]"));
    assert!(lines.contains(&"kwargs:"));
    assert!(lines.contains(&"\tGreeting {"));
    assert_eq!(lines.last(), Some(&"\t\"Hello, Seshat!\""));
}

#[test]
fn test_proxy_scenario_logs_member_access() {
    helper()
        .args(["--scenario", "proxy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[READ] [trace_helper] << run_proxy >> Proxy<Person>.name"))
        .stdout(predicate::str::contains("[WRITE] [trace_helper] << run_proxy >> Proxy<Person>.age"))
        .stdout(predicate::str::contains("[CALL] [trace_helper] << run_proxy >> Proxy<Person>.info()"))
        .stdout(predicate::str::contains("has no member 'height'"))
        .stdout(predicate::str::contains("Proxy<Person>.height").not());
}

#[test]
fn test_log_file_flag_mirrors_output() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("helper.log");

    let output = helper()
        .args(["--scenario", "all", "--log-file"])
        .arg(&log_path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let contents = fs::read_to_string(&log_path).unwrap();
    assert_eq!(contents, String::from_utf8(output).unwrap());
}

#[test]
fn test_workspace_config_silences_console_and_writes_file() {
    let workspace = tempdir().unwrap();
    let config_dir = workspace.path().join(".seshat");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[tracer]\nconsole_output = \"none\"\nlog_file = \"logs/session.log\"\n",
    )
    .unwrap();

    helper()
        .args(["--scenario", "logging", "--workspace"])
        .arg(workspace.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let contents = fs::read_to_string(workspace.path().join("logs/session.log")).unwrap();
    assert!(contents.contains(": Hello world"));
}

#[test]
fn test_unknown_scenario_is_rejected() {
    helper()
        .args(["--scenario", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'nope'"));
}

#[test]
fn test_version_flag() {
    helper()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
