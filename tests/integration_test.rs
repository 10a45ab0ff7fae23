#![cfg(unix)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn run_script(name: &str, script: &str, extra_args: &[&str]) -> Output {
    let script_path: PathBuf =
        std::env::temp_dir().join(format!("shexpect_{}_{}.script", name, std::process::id()));
    fs::write(&script_path, script).expect("Failed to write test script");

    let output = Command::new(env!("CARGO_BIN_EXE_shexpect"))
        .arg("--script")
        .arg(&script_path)
        .args(extra_args)
        .arg("--command")
        .arg("sh")
        .output()
        .expect("Failed to execute shexpect");

    let _ = fs::remove_file(&script_path);
    output
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "shexpect failed with stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_send_and_expect() {
    let script = r#"
send "echo 'Hello World'"
expect "Hello World" 5s
show "matched"
"#;
    let output = run_script("expect", script, &[]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("matched"));
}

#[test]
fn test_readline_prints_line() {
    let script = r#"
send "echo first"
readline 5s
"#;
    let output = run_script("readline", script, &[]);
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "first\n");
}

#[test]
fn test_match_exact_line() {
    let script = r#"
send "echo booting; echo READY"
match "READY" 5s
"#;
    let output = run_script("match", script, &[]);
    assert_success(&output);
}

#[test]
fn test_leftover_output_printed_at_end() {
    let script = r#"
send "echo one"
send "echo two"
wait 300ms
"#;
    let output = run_script("leftover", script, &[]);
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "one\ntwo\n");
}

#[test]
fn test_expect_timeout() {
    let script = r#"
send "echo test"
expect "this_will_never_appear" 500ms
"#;
    let output = run_script("timeout", script, &[]);
    assert!(
        !output.status.success(),
        "shexpect should fail with timeout"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Timed out"), "got: {stderr}");
    assert!(stderr.contains("this_will_never_appear"), "got: {stderr}");
}

#[test]
fn test_session_id_in_errors() {
    let script = r#"expect "nothing" 100ms"#;
    let output = run_script("session_id", script, &["--session-id", "emulator-5554"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("emulator-5554"));
}

#[test]
fn test_invalid_script() {
    let output = run_script("invalid", "invalid_command \"test\"\n", &[]);
    assert!(
        !output.status.success(),
        "shexpect should fail with invalid command"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown command"),
        "Error should mention unknown command, got: {stderr}"
    );
}

#[test]
fn test_comment_handling() {
    let script = r#"
# This is a comment
send "echo ok"  # inline comment

# Another comment
match "ok" 5s # wait for it
"#;
    let output = run_script("comments", script, &[]);
    assert_success(&output);
}

#[test]
fn test_latin1_encoding() {
    let script = r#"
send "printf 'caf\351'; echo"
match "café" 5s
"#;
    let output = run_script("latin1", script, &["--encoding", "latin1"]);
    assert_success(&output);
}

#[test]
fn test_unknown_encoding_rejected() {
    let output = run_script("bad_encoding", "wait 1ms\n", &["--encoding", "ebcdic"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown encoding"));
}
