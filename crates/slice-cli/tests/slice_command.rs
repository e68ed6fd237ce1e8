use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PROGRAM: &str = r#"#include <stdio.h>

#define SCALE 2

struct Point {
    int x;
    int y;
};

int baz(int v) {
    return v * SCALE;
}

int bar(int a) {
    struct Point p = { a, a };
    return baz(p.x) + p.y;
}

int foo(int a) {
    printf("%d\n", a);
    return bar(a);
}

int lonely(void) {
    return 7;
}

int main(void) {
    return foo(1) + lonely();
}
"#;

#[allow(deprecated)]
fn cslice() -> Command {
    Command::cargo_bin("cslice").expect("binary")
}

fn write_program(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, PROGRAM).unwrap();
    path
}

#[test]
fn batch_slice_writes_one_file_per_entry_callee() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");
    let out = temp.path().join("out");

    cslice()
        .arg("slice")
        .arg(&source)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("prog.c: 2 targets"));

    let foo = fs::read_to_string(out.join("reconstructed_foo.c")).unwrap();
    assert!(foo.contains("RECONSTRUCTED MINIMAL CONTEXT FOR: foo"));
    assert!(foo.contains("struct Point"));
    assert!(foo.contains("int baz(int v)"));
    assert!(out.join("reconstructed_lonely.c").exists());
    assert!(!out.join("reconstructed_main.c").exists());
}

#[test]
fn json_report_carries_stats() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");
    let out = temp.path().join("out");

    let output = cslice()
        .arg("slice")
        .arg(&source)
        .args(["--function", "foo", "--max-depth", "1", "--json"])
        .arg("--output-dir")
        .arg(&out)
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let target = &report["files"][0]["targets"][0];
    assert_eq!(target["target"], "foo");
    assert_eq!(target["stats"]["helpers"], 1);
    assert_eq!(target["stats"]["structs"], 1);

    let foo = fs::read_to_string(out.join("reconstructed_foo.c")).unwrap();
    assert!(!foo.contains("int baz(int v)"));
}

#[test]
fn unknown_function_is_reported_not_fatal() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");

    cslice()
        .arg("slice")
        .arg(&source)
        .args(["--function", "missing", "--function", "lonely"])
        .arg("--output-dir")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("missing: failed"))
        .stdout(predicate::str::contains("reconstructed_lonely.c"));
}

#[test]
fn directory_input_gets_per_file_output_dirs() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    write_program(&src, "one.c");
    write_program(&src, "two.c");
    let out = temp.path().join("out");

    cslice()
        .arg("slice")
        .arg(&src)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("one/reconstructed_foo.c").exists());
    assert!(out.join("two/reconstructed_foo.c").exists());
}

#[test]
fn targets_lists_entry_callees() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");

    let output = cslice()
        .arg("targets")
        .arg(&source)
        .arg("--json")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let targets: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let names: Vec<_> = targets
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["foo", "lonely"]);
}

#[test]
fn targets_without_entry_is_empty() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");

    cslice()
        .arg("targets")
        .arg(&source)
        .args(["--entry", "start", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn graph_focus_shows_depths() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");

    cslice()
        .arg("graph")
        .arg(&source)
        .args(["--function", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("callees of foo: bar"))
        .stdout(predicate::str::contains("callers of foo: main"))
        .stdout(predicate::str::contains("depth 2: baz"));
}

#[test]
fn graph_rejects_unknown_function() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");

    cslice()
        .arg("graph")
        .arg(&source)
        .args(["--function", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Function `nope` not found"));
}

#[test]
fn strip_entry_rewrites_in_place() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");

    cslice()
        .arg("strip-entry")
        .arg(&source)
        .args(["--include", "#include \"harness.c\""])
        .assert()
        .success();

    let stripped = fs::read_to_string(&source).unwrap();
    assert!(!stripped.contains("int main(void)"));
    assert!(stripped.contains("int lonely(void)"));
    assert!(stripped.ends_with("#include \"harness.c\"\n"));

    // a second run finds no entry point
    cslice()
        .arg("strip-entry")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to strip `main`"));
}

#[test]
fn config_file_overrides_defaults() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");
    let config = temp.path().join("cslice.toml");
    fs::write(&config, "max_depth = 0\n").unwrap();

    let output = cslice()
        .arg("slice")
        .arg(&source)
        .args(["--function", "foo", "--json"])
        .arg("--config")
        .arg(&config)
        .arg("--output-dir")
        .arg(temp.path())
        .output()
        .expect("command run");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(report["files"][0]["targets"][0]["stats"]["helpers"], 0);
}

#[test]
fn invalid_config_fails() {
    let temp = tempdir().unwrap();
    let source = write_program(temp.path(), "prog.c");
    let config = temp.path().join("cslice.toml");
    fs::write(&config, "full_body_line_limit = 0\n").unwrap();

    cslice()
        .arg("slice")
        .arg(&source)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
