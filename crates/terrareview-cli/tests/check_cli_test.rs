//! Integration tests for the `terrareview` binary.
//!
//! Each test runs the compiled binary with `XDG_CONFIG_HOME` pointed at a
//! temporary directory so no real config file is read or written.

use std::path::Path;
use std::process::{Command, Output};

use terrareview_test_utils::{JSON_PLAN, NON_PLAN_JSON, TEXT_PLAN};

fn terrareview(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_terrareview"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("TERRAREVIEW_API_KEY")
        .env_remove("TERRAREVIEW_SESSION_SECRET")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run terrareview binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn check_valid_json_plan_exits_zero() {
    let tmp = tempfile::TempDir::new().unwrap();
    let plan = tmp.path().join("plan.json");
    std::fs::write(&plan, JSON_PLAN).unwrap();

    let output = terrareview(tmp.path(), &["check", plan.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&output);
    assert!(out.contains("plan.json: valid (JSON)"), "stdout: {out}");
}

#[test]
fn check_valid_text_plan_exits_zero() {
    let tmp = tempfile::TempDir::new().unwrap();
    let plan = tmp.path().join("plan.txt");
    std::fs::write(&plan, TEXT_PLAN).unwrap();

    let output = terrareview(tmp.path(), &["check", plan.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Valid Terraform text plan detected"));
}

#[test]
fn check_invalid_plan_exits_one() {
    let tmp = tempfile::TempDir::new().unwrap();
    let plan = tmp.path().join("package.json");
    std::fs::write(&plan, NON_PLAN_JSON).unwrap();

    let output = terrareview(tmp.path(), &["check", plan.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("package.json: invalid (JSON)"));
}

#[test]
fn check_disallowed_extension_exits_one() {
    let tmp = tempfile::TempDir::new().unwrap();
    let plan = tmp.path().join("plan.tfplan");
    std::fs::write(&plan, TEXT_PLAN).unwrap();

    let output = terrareview(tmp.path(), &["check", plan.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("File type not allowed"));
}

#[test]
fn check_summarize_without_key_reports_missing_credential() {
    let tmp = tempfile::TempDir::new().unwrap();
    let plan = tmp.path().join("plan.txt");
    std::fs::write(&plan, TEXT_PLAN).unwrap();

    let output = terrareview(tmp.path(), &["check", "--summarize", plan.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("AI analysis unavailable: missing credential"));
}

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let tmp = tempfile::TempDir::new().unwrap();

    let output = terrareview(tmp.path(), &["init"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let path = tmp.path().join("terrareview").join("config.toml");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[session]"));
    assert!(contents.contains("secret = "));
    assert!(contents.contains("port = 5001"));

    let again = terrareview(tmp.path(), &["init"]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already exists"));

    let forced = terrareview(tmp.path(), &["init", "--force"]);
    assert!(forced.status.success());
    assert_ne!(std::fs::read_to_string(&path).unwrap(), contents, "secret is regenerated");
}

#[test]
fn check_uses_markers_from_config_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = tmp.path().join("terrareview");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[markers]\nstructured_fields = [\"name\"]\ntextual_substrings = [\"Plan:\"]\n",
    )
    .unwrap();

    let plan = tmp.path().join("package.json");
    std::fs::write(&plan, NON_PLAN_JSON).unwrap();

    let output = terrareview(tmp.path(), &["check", plan.to_str().unwrap()]);
    assert!(output.status.success(), "custom markers accept the document");
}
