//! Tests running the `bindless-book` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn docs_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("docs")
}

fn run(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bindless-book"))
        .args(args)
        .arg(dir)
        .output()
        .expect("failed to run bindless-book")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Book in a fresh directory whose summary links a page that does not exist.
fn broken_book(name: &str) -> PathBuf {
    let root = Path::new(env!("CARGO_TARGET_TMPDIR")).join(name);
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("book.toml"), "[book]\ntitle = \"Broken\"\n").unwrap();
    fs::write(
        root.join("src").join("SUMMARY.md"),
        "# Summary\n\n- [Present](present.md)\n- [Missing](missing.md)\n",
    )
    .unwrap();
    fs::write(root.join("src").join("present.md"), "# Present\n").unwrap();
    root
}

#[test]
fn test_lint_repository_book_succeeds() {
    let output = run(&["lint", "--deny-warnings", "--check-orphans"], &docs_dir());
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("0 errors, 0 warnings"));
}

#[test]
fn test_lint_broken_book_fails() {
    let root = broken_book("cli-broken-text");
    let output = run(&["lint"], &root);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("error[missing-page]"), "{text}");
    assert!(text.contains("1 errors"), "{text}");
}

#[test]
fn test_lint_json_output_parses() {
    let root = broken_book("cli-broken-json");
    let output = run(&["lint", "--format", "json"], &root);
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let diagnostics = report["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["rule"], "missing-page");
    assert_eq!(diagnostics[0]["severity"], "error");
    assert_eq!(diagnostics[0]["line"], 4);
}

#[test]
fn test_missing_book_reports_error() {
    let root = Path::new(env!("CARGO_TARGET_TMPDIR")).join("cli-no-book");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();

    let output = run(&["lint"], &root);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: "));
}

#[test]
fn test_outline_indents_nested_chapters() {
    let output = run(&["outline"], &docs_dir());
    assert!(output.status.success());

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&"Overview"));
    assert!(lines.contains(&"Getting Started"));
    assert!(lines.contains(&"  1. Creating a Device"));
    let nested = lines
        .iter()
        .find(|line| line.ends_with(" Per-Frame Uploads"))
        .expect("nested chapter in outline");
    assert!(nested.starts_with("    3.1. "), "{nested}");
}
