use std::{
    io::Write,
    path::PathBuf,
    process::{Command, Output, Stdio},
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fox-cli-{}-{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).expect("create a scratch directory");
    dir
}

fn fox(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_fox"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("the fox binary should start");

    child.stdin.take().expect("stdin is piped").write_all(stdin.as_bytes()).expect("write to stdin");
    child.wait_with_output().expect("the fox binary should finish")
}

fn run_script(name: &str, source: &str, flags: &[&str]) -> Output {
    let dir = scratch_dir(name);
    let path = dir.join("main.fox");
    std::fs::write(&path, source).expect("write the script");
    std::fs::write(dir.join("broken.fox"), "var(a 1)").expect("write the broken import");

    let path = path.to_string_lossy().to_string();
    let mut args = flags.to_vec();
    args.push(&path);
    let output = fox(&args, "");

    std::fs::remove_dir_all(&dir).ok();
    output
}

#[test]
fn successful_scripts_exit_cleanly() {
    let output = run_script("ok", r#"println("hello")"#, &[]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
}

#[test]
fn syntax_errors_exit_with_65() {
    let output = run_script("syntax", "var(a 1)", &[]);
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Syntax error"));
}

#[test]
fn resolution_errors_exit_with_65() {
    let output = run_script("resolve", "{ var(a, 1), var(a, 2) }", &[]);
    assert_eq!(output.status.code(), Some(65));
}

#[test]
fn runtime_errors_exit_with_70() {
    let output = run_script("runtime", r#"println("before") 1 / 0 println("after")"#, &[]);
    assert_eq!(output.status.code(), Some(70));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "before\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cannot divide by zero."));
}

#[test]
fn missing_scripts_exit_with_66() {
    let output = fox(&["this/script/does/not/exist.fox"], "");
    assert_eq!(output.status.code(), Some(66));
}

#[test]
fn broken_imports_follow_the_nested_error_policy() {
    let source = r#"println(import("broken.fox"))"#;

    let propagated = run_script("propagate", source, &[]);
    assert_eq!(propagated.status.code(), Some(65));

    let contained = run_script("contain", source, &["--contain-nested-errors"]);
    assert_eq!(contained.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&contained.stdout), "null\n");
}

#[test]
fn the_prompt_continues_after_errors() {
    let output = fox(&[], "1 / 0\nvar(x, 40)\nx + 2\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0));
    assert!(stderr.contains("Cannot divide by zero."), "the failure is reported, got {}", stderr);
    assert!(stdout.contains("var(x, 40) ===> 40"), "got {}", stdout);
    assert!(stdout.contains("x + 2 ===> 42"), "definitions persist between lines, got {}", stdout);
}
