// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tempfile::{NamedTempFile, tempdir};

use testwatch::cli::CliArgs;
use testwatch::config::{DEFAULT_DEBOUNCE, load_and_validate, load_or_default};
use testwatch::errors::WatchError;
use testwatch::resolve_config;
use testwatch::types::WatchMode;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_file_is_loaded_and_validated() {
    let file = config_file(
        r#"
[watch]
paths = ["./src", "./lib"]
ignore = ["**/generated/**"]
test_patterns = ["*_test.go"]
mode = "related"
debounce_ms = 250
clear_screen = true
run_on_start = true

[runner]
command = "go test -count=1 {targets}"
all_target = "./pkg/..."
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.watch.paths, vec![PathBuf::from("./src"), PathBuf::from("./lib")]);
    assert_eq!(cfg.watch.ignore_patterns, vec!["**/generated/**".to_string()]);
    assert_eq!(cfg.watch.mode, WatchMode::Related);
    assert_eq!(cfg.watch.debounce_interval, Duration::from_millis(250));
    assert!(cfg.watch.clear_screen_on_change);
    assert!(cfg.watch.run_on_start);
    assert_eq!(cfg.runner.command, "go test -count=1 {targets}");
    assert_eq!(cfg.runner.all_target, "./pkg/...");
}

#[test]
fn unknown_mode_is_reported_as_such() {
    let file = config_file(
        r#"
[watch]
paths = ["."]
mode = "sometimes"
"#,
    );

    match load_and_validate(file.path()) {
        Err(WatchError::UnknownMode(mode)) => assert_eq!(mode, "sometimes"),
        other => panic!("expected UnknownMode, got {other:?}"),
    }
}

#[test]
fn negative_debounce_is_a_config_error() {
    let file = config_file(
        r#"
[watch]
paths = ["."]
debounce_ms = -10
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(WatchError::Config(_))
    ));
}

#[test]
fn missing_paths_are_rejected() {
    let file = config_file("[runner]\ncommand = \"make test\"\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(WatchError::Config(_))
    ));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = config_file("[watch\npaths = 1");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(WatchError::Toml(_))
    ));
}

#[test]
fn missing_file_is_io_error_unless_defaults_allowed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Testwatch.toml");

    assert!(matches!(load_and_validate(&path), Err(WatchError::Io(_))));

    let raw = load_or_default(&path).unwrap();
    assert!(raw.watch.paths.is_empty());
    assert_eq!(raw.runner.command, "go test {targets}");
}

#[test]
fn cli_flags_override_file_values() {
    let file = config_file(
        r#"
[watch]
paths = ["./src"]
mode = "all"
debounce_ms = 250
"#,
    );
    let config_arg = file.path().to_string_lossy().into_owned();

    let args = CliArgs::try_parse_from([
        "testwatch",
        "--config",
        config_arg.as_str(),
        "--path",
        "./cmd",
        "--mode",
        "changed",
        "--debounce-ms",
        "0",
        "--command",
        "cargo test",
        "--clear",
    ])
    .unwrap();

    let cfg = resolve_config(&args).unwrap();
    assert_eq!(cfg.watch.paths, vec![PathBuf::from("./cmd")]);
    assert_eq!(cfg.watch.mode, WatchMode::Changed);
    assert_eq!(cfg.watch.debounce_interval, DEFAULT_DEBOUNCE);
    assert!(cfg.watch.clear_screen_on_change);
    assert_eq!(cfg.runner.command, "cargo test");
}

#[test]
fn cli_alone_is_enough_without_a_config_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let missing_arg = missing.to_string_lossy().into_owned();

    let args =
        CliArgs::try_parse_from(["testwatch", "--config", missing_arg.as_str(), "--path", "."])
            .unwrap();

    let cfg = resolve_config(&args).unwrap();
    assert_eq!(cfg.watch.paths, vec![PathBuf::from(".")]);
    assert_eq!(cfg.watch.mode, WatchMode::All);
}
