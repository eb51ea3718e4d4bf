//! Integration tests for the CLI interface
//!
//! Every test points the binary at its own store and an empty config file so
//! nothing from the host configuration leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn nlm(&self) -> Command {
        let mut cmd = Command::cargo_bin("nlm").unwrap();
        cmd.arg("--config")
            .arg(self.dir.path().join("config.toml"))
            .arg("--store")
            .arg(self.dir.path().join("macros.json"))
            .env_remove("RUST_LOG")
            .env_remove("NLM_STORE")
            .env_remove("NLM_STORE_BACKEND")
            .env_remove("NLM_SHELL")
            .env_remove("NLM_SAFETY_CHECKS");
        cmd
    }

    fn define(&self, line: &str) {
        self.nlm().args(["do", "--yes", line]).assert().success();
    }
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = Command::cargo_bin("nlm").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("nlm").unwrap();
    cmd.arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_define_then_list_and_show() {
    let ws = Workspace::new();
    ws.nlm()
        .args(["do", r#"remember: "greet {who}" -> echo Hello {who}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Macro 'greet {who}' saved"));

    ws.nlm()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Macros (1):"))
        .stdout(predicate::str::contains("* greet {who}"));

    ws.nlm()
        .args(["show", "greet {who}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. echo Hello {who}"));

    assert!(ws.dir.path().join("macros.json").exists());
}

#[test]
fn test_empty_list_hints_at_definition_syntax() {
    let ws = Workspace::new();
    ws.nlm()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No macros defined yet."));
}

#[cfg(unix)]
#[test]
fn test_run_parameterized_macro() {
    let ws = Workspace::new();
    ws.define(r#"remember: "greet {who}" -> echo Hello {who}"#);

    ws.nlm()
        .args(["do", "--yes", "greet", "wide", "world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/1] echo Hello wide world"))
        .stdout(predicate::str::contains("    Hello wide world"))
        .stdout(predicate::str::contains("[OK] completed"));

    ws.nlm()
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("Runs: echo Hello {who}"));
}

#[cfg(unix)]
#[test]
fn test_run_halts_at_failing_step() {
    let ws = Workspace::new();
    ws.define(r#"remember: "abc" -> echo A ; false ; echo B"#);

    ws.nlm()
        .args(["do", "--yes", "abc"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[2/3] false"))
        .stdout(predicate::str::contains("[X] halted at step 2"))
        .stdout(predicate::str::contains("[3/3]").not());
}

#[test]
fn test_run_without_confirmation_is_cancelled() {
    let ws = Workspace::new();
    ws.define(r#"remember: "build" -> echo building"#);

    ws.nlm()
        .args(["do", "build"])
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::contains("declined"))
        .stdout(predicate::str::contains("Cancelled."))
        .stdout(predicate::str::contains("[1/1]").not());
}

#[cfg(unix)]
#[test]
fn test_dangerous_macro_needs_token() {
    let ws = Workspace::new();
    let target = ws.dir.path().join("scratch");
    fs::create_dir_all(target.join("nested")).unwrap();
    ws.define(r#"remember: "wipe {dir}" -> rm -rf {dir}"#);

    let invocation = format!("wipe {}", target.display());

    ws.nlm()
        .args(["do", "--yes", &invocation])
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[!] WARNING: dangerous commands detected"))
        .stdout(predicate::str::contains("recursive delete"))
        .stdout(predicate::str::contains("Cancelled."));
    assert!(target.exists());

    ws.nlm()
        .args(["do", "--confirm", "yes", &invocation])
        .write_stdin("")
        .assert()
        .failure();
    assert!(target.exists());

    ws.nlm()
        .args(["do", "--confirm", "RUN", &invocation])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] completed"));
    assert!(!target.exists());
}

#[test]
fn test_unrecognized_input_fails() {
    let ws = Workspace::new();
    ws.nlm()
        .args(["do", "frobnicate the widgets"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unrecognized input"));
}

#[test]
fn test_malformed_definition_reports_error() {
    let ws = Workspace::new();
    ws.nlm()
        .args(["do", r#"remember: "oops -> ls"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Malformed definition"));
}

#[test]
fn test_duplicate_definition_reports_error() {
    let ws = Workspace::new();
    ws.define(r#"remember: "build" -> make"#);
    ws.nlm()
        .args(["do", r#"remember: "Build" -> cargo build"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_show_missing_macro_fails() {
    let ws = Workspace::new();
    ws.nlm()
        .args(["show", "nothing here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Not found: nothing here"));
}

#[test]
fn test_delete_with_yes() {
    let ws = Workspace::new();
    ws.define(r#"remember: "build" -> make"#);

    ws.nlm()
        .args(["delete", "--yes", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Macro 'build' deleted."));

    ws.nlm()
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("No macros defined yet."));
}

#[test]
fn test_check_classifies_without_running() {
    let ws = Workspace::new();
    ws.nlm()
        .args(["check", "ls -la ; sudo shutdown -h now"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "step 2: sudo shutdown -h now (privilege escalation, system power control)",
        ));

    ws.nlm()
        .args(["check", "cargo build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("safe"));
}

#[test]
fn test_interactive_session_from_stdin() {
    let ws = Workspace::new();
    ws.nlm()
        .write_stdin("remember: \"hello world\" -> echo hi\nmacros list\nhelp\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Macro 'hello world' saved"))
        .stdout(predicate::str::contains("Macros (1):"))
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn test_memory_backend_does_not_persist() {
    let ws = Workspace::new();
    ws.nlm()
        .env("NLM_STORE_BACKEND", "memory")
        .args(["do", r#"remember: "build" -> make"#])
        .assert()
        .success();

    assert!(!ws.dir.path().join("macros.json").exists());
}
