use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn ren(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ren"));
    cmd.current_dir(dir.path())
        .env_remove("REN_CONFIG")
        .env_remove("REN_PROMPT")
        .env_remove("REN_NO_BANNER")
        .env_remove("RUST_LOG")
        .env_remove("REN_LOG");
    cmd
}

fn run_ren(args: &[&str]) -> Output {
    let dir = TempDir::new().unwrap();
    ren(&dir)
        .args(args)
        .output()
        .expect("Failed to execute ren binary")
}

fn run_repl(dir: &TempDir, args: &[&str], input: &str) -> Output {
    let mut child = ren(dir)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn ren binary");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_help_command() {
    let output = run_ren(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--eval"));
    assert!(stdout.contains("--no-banner"));
    assert!(stdout.contains("REN_MAX_EVAL_DEPTH"));
}

#[test]
fn test_eval_success_and_failure() {
    let output = run_ren(&["--eval", "add 3 4"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "== 7");

    let output = run_ren(&["--eval", "join \"ren\" \"-garden\""]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "== \"ren-garden\"");

    let output = run_ren(&["-e", "add 3 \"four\""]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("** "), "{stdout}");
    assert!(stdout.contains("integer!"));
}

#[test]
fn test_repl_session() {
    let dir = TempDir::new().unwrap();
    let output = run_repl(
        &dir,
        &["--no-banner", "--prompt", "> "],
        "echo [a b]\n\nx: 10\nadd x x\nmissing-word\nquit\nadd 1 1\n",
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Ren console"));
    assert!(stdout.contains("== [a b]"));
    assert!(stdout.contains("== 20"));
    assert!(stdout.contains("** "));
    // Nothing after quit is evaluated
    assert!(!stdout.contains("== 2\n"));
}

#[test]
fn test_config_file_sets_prompt_and_depth() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".ren.toml"),
        "prompt = \"garden> \"\nbanner = false\n\n[engine]\nmax_eval_depth = 2\n",
    )
    .unwrap();

    let output = run_repl(&dir, &[], "echo echo echo 1\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("garden> "), "{stdout}");
    assert!(stdout.contains("** "), "{stdout}");

    let output = run_repl(&dir, &["--prompt", "cli> "], "exit\n");
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("cli> "));
}

#[test]
fn test_invalid_config_file_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ren.toml"), "prompt = [").unwrap();
    let output = ren(&dir).args(["--eval", "1"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse TOML config"));
}
