use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use gragra::GrammarDocument;

const SAVE: &str = env!("CARGO_BIN_EXE_save");
const TRANSFORM_LAYERED: &str = env!("CARGO_BIN_EXE_transform-layered");

const MARKED: &str = r#"
name: marked
graph:
  nodes:
    - id: 0
      type: item
      attributes:
        marked: true
    - id: 1
      type: item
rules:
  - name: delete marked
    from:
      nodes:
        - id: 0
          attributes:
            marked: [eq, true]
    to:
      - delete: 0
"#;

const GROWING: &str = r#"
name: growing
graph:
  nodes:
    - id: 0
      type: tip
rules:
  - name: grow
    from:
      nodes:
        - id: 0
          type: tip
    to:
      - add:
          id: 1
          node:
            type: tip
"#;

fn run(program: &str, args: &[&Path]) -> Output {
    Command::new(program).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_save_copies_document() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("in.yaml");
    let to = dir.path().join("out.yaml");
    fs::write(&from, MARKED).unwrap();

    let output = run(SAVE, &[from.as_path(), to.as_path()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Copying file from"));
    assert_eq!(
        GrammarDocument::load(&to).unwrap(),
        GrammarDocument::load(&from).unwrap()
    );
}

#[test]
fn test_save_fails_on_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("missing.yaml");
    let to = dir.path().join("out.yaml");

    let output = run(SAVE, &[from.as_path(), to.as_path()]);
    assert!(!output.status.success());
    assert!(!to.exists());
}

#[test]
fn test_save_requires_both_paths() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(SAVE, &[dir.path()]);
    assert!(!output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).is_empty());
}

#[test]
fn test_transform_layered_rewrites_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("in.yaml");
    let to = dir.path().join("out.yaml");
    fs::write(&from, MARKED).unwrap();

    let output = run(TRANSFORM_LAYERED, &[from.as_path(), to.as_path()]);
    assert!(output.status.success());
    let printed = stdout(&output);
    assert!(printed.contains("Loading file"));
    assert!(printed.contains("Transform layered: marked"));
    assert!(printed.contains("Saving result to"));

    let result = GrammarDocument::load(&to).unwrap();
    assert_eq!(result.graph.order(), 1);
    // The source is left alone.
    assert_eq!(GrammarDocument::load(&from).unwrap().graph.order(), 2);
}

#[test]
fn test_transform_layered_stops_on_malformed_source() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("in.yaml");
    let to = dir.path().join("out.yaml");
    fs::write(&from, "name: [unclosed").unwrap();

    let output = run(TRANSFORM_LAYERED, &[from.as_path(), to.as_path()]);
    assert!(!output.status.success());
    let printed = stdout(&output);
    assert!(printed.contains("Loading file"));
    assert!(!printed.contains("Transform layered"));
    assert!(!printed.contains("Saving result"));
    assert!(!to.exists());
}

#[test]
fn test_transform_layered_step_limit_skips_save() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("in.yaml");
    let to = dir.path().join("out.yaml");
    fs::write(&from, GROWING).unwrap();

    let output = Command::new(TRANSFORM_LAYERED)
        .arg(&from)
        .arg(&to)
        .args(&["--max-steps", "3"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!stdout(&output).contains("Saving result"));
    assert!(!to.exists());
}
