// tests/driver_runs.rs

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use testwatch::console::{CLEAR_SCREEN, Console};
use testwatch::engine::{TestRunDriver, TestTrigger};
use testwatch::exec::TestRunOutput;
use testwatch::fs::mock::MockFileSystem;
use testwatch::types::{ChangeKind, WatchMode};
use testwatch::watch::ConventionFinder;
use testwatch_test_utils::builders::{WatchConfigBuilder, change, test_change};
use testwatch_test_utils::fakes::FakeRunner;
use testwatch_test_utils::{SharedBuffer, init_tracing};

struct Setup {
    driver: TestRunDriver,
    runner: FakeRunner,
    out: SharedBuffer,
}

fn setup(files: &[&str], runner: FakeRunner) -> Setup {
    init_tracing();
    let fs = MockFileSystem::with_files(files.iter().copied());
    let finder = ConventionFinder::new(Arc::new(fs), &["*_test.go".to_string()]).unwrap();
    let out = SharedBuffer::default();
    let driver = TestRunDriver::new(
        Arc::new(runner.clone()),
        Arc::new(finder),
        Arc::new(Console::new(Box::new(out.clone()))),
        "./...",
    );
    Setup { driver, runner, out }
}

fn targets(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn changed_file_runs_its_package() {
    let s = setup(&["pkg/a.go", "pkg/a_test.go"], FakeRunner::new());
    let ev = change("pkg/a.go", ChangeKind::Modified);

    s.driver
        .trigger_tests_for_file(CancellationToken::new(), &ev)
        .await
        .unwrap();

    assert_eq!(s.runner.runs(), vec![targets(&["./pkg"])]);
    let out = s.out.contents();
    assert!(out.contains("Running tests: ./pkg"));
    assert!(out.contains("PASS"));
}

#[tokio::test]
async fn related_impl_change_runs_package_once() {
    let s = setup(
        &["pkg/a.go", "pkg/a_test.go", "pkg/b_test.go"],
        FakeRunner::new(),
    );
    let ev = change("pkg/a.go", ChangeKind::Modified);

    s.driver
        .trigger_related_tests(CancellationToken::new(), &ev)
        .await
        .unwrap();

    assert_eq!(s.runner.runs(), vec![targets(&["./pkg"])]);
}

#[tokio::test]
async fn related_test_change_in_root_package() {
    let s = setup(&["a.go", "a_test.go"], FakeRunner::new());
    let ev = test_change("a_test.go");

    s.driver
        .trigger_related_tests(CancellationToken::new(), &ev)
        .await
        .unwrap();

    assert_eq!(s.runner.runs(), vec![targets(&["."])]);
}

#[tokio::test]
async fn all_tests_use_the_configured_target() {
    let s = setup(&[], FakeRunner::new());
    s.driver
        .trigger_all_tests(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(s.runner.runs(), vec![targets(&["./..."])]);
}

#[tokio::test]
async fn failing_tests_are_reported_not_returned() {
    let runner = FakeRunner::new().returning(TestRunOutput::failed("--- FAIL: TestA\n", Some(1)));
    let s = setup(&["pkg/a.go"], runner);

    s.driver
        .trigger_all_tests(CancellationToken::new())
        .await
        .unwrap();

    let out = s.out.contents();
    assert!(out.contains("--- FAIL: TestA"));
    assert!(out.contains("FAIL (exit code 1)"));
}

#[tokio::test]
async fn runner_errors_fail_the_trigger() {
    let s = setup(&["pkg/a.go"], FakeRunner::new().erroring("spawn failed"));
    let ev = change("pkg/a.go", ChangeKind::Modified);

    let err = s
        .driver
        .trigger_tests_for_file(CancellationToken::new(), &ev)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("spawn failed"));
}

#[tokio::test]
async fn batch_start_clears_screen_when_configured() {
    let s = setup(&[], FakeRunner::new());
    let cfg = WatchConfigBuilder::new()
        .mode(WatchMode::Changed)
        .clear_screen(true)
        .build();

    s.driver.batch_started(&cfg, &[change("pkg/a.go", ChangeKind::Modified)]);

    let text = s.out.contents();
    assert!(text.starts_with(CLEAR_SCREEN));
    assert!(text.contains("1 file(s) changed (changed): pkg/a.go"));
}

#[tokio::test]
async fn batch_start_keeps_screen_by_default() {
    let s = setup(&[], FakeRunner::new());
    let cfg = WatchConfigBuilder::new().build();

    s.driver.batch_started(&cfg, &[change("a.go", ChangeKind::Created)]);

    let text = s.out.contents();
    assert!(!text.contains(CLEAR_SCREEN));
    assert!(text.contains("1 file(s) changed (all): a.go"));
}
