// tests/coordinator_lifecycle.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

use testwatch::engine::WatchCoordinator;
use testwatch::errors::WatchError;
use testwatch::types::{ChangeKind, WatchMode};
use testwatch::watch::Debouncer;
use testwatch_test_utils::builders::{WatchConfigBuilder, change};
use testwatch_test_utils::fakes::{FailingStopDebouncer, FakeWatcher, RecordingTrigger, TriggerCall};
use testwatch_test_utils::{init_tracing, with_timeout};

struct Harness {
    coordinator: WatchCoordinator,
    watcher: FakeWatcher,
    trigger: RecordingTrigger,
}

fn harness(mode: WatchMode) -> Harness {
    init_tracing();
    let watcher = FakeWatcher::new();
    let trigger = RecordingTrigger::new();
    let cfg = WatchConfigBuilder::new().mode(mode).debounce_ms(50).build();
    let coordinator = WatchCoordinator::new(
        cfg,
        Arc::new(watcher.clone()),
        Arc::new(Debouncer::new(Duration::from_millis(50))),
        Arc::new(trigger.clone()),
    );
    Harness {
        coordinator,
        watcher,
        trigger,
    }
}

#[tokio::test(start_paused = true)]
async fn start_records_status_and_rejects_second_start() {
    let h = harness(WatchMode::Changed);
    let before = h.coordinator.get_status();
    assert!(!before.running);
    assert!(before.started_at.is_none());

    h.coordinator.start(CancellationToken::new()).unwrap();

    let status = h.coordinator.get_status();
    assert!(status.running);
    assert!(status.started_at.is_some());
    assert_eq!(status.watched_paths, vec![PathBuf::from("./src")]);
    assert_eq!(status.mode, WatchMode::Changed);

    let err = h.coordinator.start(CancellationToken::new()).unwrap_err();
    assert!(matches!(err, WatchError::AlreadyRunning));
    assert!(h.coordinator.is_running());

    h.coordinator.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_twice_is_a_no_op_the_second_time() {
    let h = harness(WatchMode::All);
    h.coordinator.start(CancellationToken::new()).unwrap();

    h.coordinator.stop().unwrap();
    h.coordinator.stop().unwrap();

    assert!(!h.coordinator.get_status().running);
    assert_eq!(h.watcher.close_calls(), 1);
    with_timeout(h.coordinator.join_loop()).await;
}

#[tokio::test(start_paused = true)]
async fn stop_without_start_succeeds() {
    let h = harness(WatchMode::All);
    h.coordinator.stop().unwrap();
    assert_eq!(h.watcher.close_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn watcher_startup_failure_is_reported_and_counted() {
    init_tracing();
    let watcher = FakeWatcher::new().failing_watch("permission denied");
    let coordinator = WatchCoordinator::new(
        WatchConfigBuilder::new().build(),
        Arc::new(watcher),
        Arc::new(Debouncer::new(Duration::from_millis(50))),
        Arc::new(RecordingTrigger::new()),
    );

    let err = coordinator.start(CancellationToken::new()).unwrap_err();
    match err {
        WatchError::Watcher { op, source } => {
            assert_eq!(op, "watch");
            assert!(source.to_string().contains("permission denied"));
        }
        other => panic!("expected watcher error, got {other:?}"),
    }

    let status = coordinator.get_status();
    assert!(!status.running);
    assert_eq!(status.error_count, 1);
}

#[tokio::test(start_paused = true)]
async fn start_with_empty_paths_is_a_config_error() {
    init_tracing();
    let coordinator = WatchCoordinator::new(
        WatchConfigBuilder::new().paths(&[]).build(),
        Arc::new(FakeWatcher::new()),
        Arc::new(Debouncer::new(Duration::from_millis(50))),
        Arc::new(RecordingTrigger::new()),
    );

    let err = coordinator.start(CancellationToken::new()).unwrap_err();
    assert!(matches!(err, WatchError::Config(_)));
    assert!(!coordinator.is_running());
}

#[tokio::test(start_paused = true)]
async fn raw_events_are_counted_debounced_and_dispatched() {
    let h = harness(WatchMode::Changed);
    h.coordinator.start(CancellationToken::new()).unwrap();

    h.watcher.emit(change("pkg/a.go", ChangeKind::Modified)).await.unwrap();
    h.watcher.emit(change("pkg/a.go", ChangeKind::Modified)).await.unwrap();
    h.watcher.emit(change("pkg/b.go", ChangeKind::Created)).await.unwrap();

    with_timeout(h.trigger.wait_for_calls(2)).await;

    let mut calls = h.trigger.calls();
    calls.sort_by_key(|c| format!("{c:?}"));
    assert_eq!(
        calls,
        vec![
            TriggerCall::ForFile(PathBuf::from("pkg/a.go")),
            TriggerCall::ForFile(PathBuf::from("pkg/b.go")),
        ]
    );
    assert_eq!(h.trigger.batches().len(), 1);

    let status = h.coordinator.get_status();
    assert_eq!(status.event_count, 3);
    assert_eq!(status.error_count, 0);
    assert!(status.last_event_at.is_some());

    h.coordinator.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn loop_survives_trigger_failures() {
    init_tracing();
    let watcher = FakeWatcher::new();
    let trigger = RecordingTrigger::new().failing_on(1);
    let coordinator = WatchCoordinator::new(
        WatchConfigBuilder::new().mode(WatchMode::Related).build(),
        Arc::new(watcher.clone()),
        Arc::new(Debouncer::new(Duration::from_millis(50))),
        Arc::new(trigger.clone()),
    );
    coordinator.start(CancellationToken::new()).unwrap();

    watcher.emit(change("a.go", ChangeKind::Modified)).await.unwrap();
    with_timeout(trigger.wait_for_calls(1)).await;

    sleep(Duration::from_millis(100)).await;
    watcher.emit(change("b.go", ChangeKind::Modified)).await.unwrap();
    with_timeout(trigger.wait_for_calls(2)).await;

    assert_eq!(
        trigger.calls(),
        vec![
            TriggerCall::Related(PathBuf::from("a.go")),
            TriggerCall::Related(PathBuf::from("b.go")),
        ]
    );
    assert_eq!(coordinator.get_status().error_count, 1);
    coordinator.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn external_cancellation_ends_loop_but_leaves_release_to_stop() {
    let h = harness(WatchMode::All);
    let cancel = CancellationToken::new();
    h.coordinator.start(cancel.clone()).unwrap();

    cancel.cancel();
    with_timeout(h.coordinator.join_loop()).await;

    assert!(h.coordinator.get_status().running);
    assert_eq!(h.watcher.close_calls(), 0);
    assert_eq!(h.coordinator.get_status().error_count, 0);

    h.coordinator.stop().unwrap();
    assert_eq!(h.watcher.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_reports_all_shutdown_failures_together() {
    init_tracing();
    let watcher = FakeWatcher::new().failing_close("close failed");
    let coordinator = WatchCoordinator::new(
        WatchConfigBuilder::new().build(),
        Arc::new(watcher.clone()),
        Arc::new(FailingStopDebouncer::new(Duration::from_millis(50))),
        Arc::new(RecordingTrigger::new()),
    );
    coordinator.start(CancellationToken::new()).unwrap();

    let err = coordinator.stop().unwrap_err();
    match err {
        WatchError::Shutdown(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(matches!(errors[0], WatchError::Debouncer { op: "stop", .. }));
            assert!(matches!(errors[1], WatchError::Watcher { op: "close", .. }));
        }
        other => panic!("expected shutdown error, got {other:?}"),
    }

    let status = coordinator.get_status();
    assert!(!status.running);
    assert_eq!(status.error_count, 2);
    assert_eq!(watcher.close_calls(), 1);

    coordinator.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn configure_updates_mode_and_next_debounce_cycle() {
    init_tracing();
    let debouncer = Arc::new(Debouncer::new(Duration::from_millis(50)));
    let coordinator = WatchCoordinator::new(
        WatchConfigBuilder::new().mode(WatchMode::All).build(),
        Arc::new(FakeWatcher::new()),
        debouncer.clone(),
        Arc::new(RecordingTrigger::new()),
    );

    let new_cfg = WatchConfigBuilder::new()
        .paths(&["./other"])
        .mode(WatchMode::Related)
        .debounce_ms(120)
        .build();
    coordinator.configure(new_cfg).unwrap();

    let status = coordinator.get_status();
    assert_eq!(status.mode, WatchMode::Related);
    assert_eq!(debouncer.interval(), Duration::from_millis(120));
    assert_eq!(coordinator.config().paths, vec![Path::new("./other").to_path_buf()]);
}

#[tokio::test(start_paused = true)]
async fn configure_while_running_keeps_watched_paths() {
    let h = harness(WatchMode::All);
    h.coordinator.start(CancellationToken::new()).unwrap();

    h.coordinator
        .configure(WatchConfigBuilder::new().paths(&["./elsewhere"]).build())
        .unwrap();

    assert_eq!(
        h.coordinator.get_status().watched_paths,
        vec![PathBuf::from("./src")]
    );
    h.coordinator.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn configure_rejects_invalid_config() {
    let h = harness(WatchMode::Changed);
    let err = h
        .coordinator
        .configure(WatchConfigBuilder::new().paths(&[]).mode(WatchMode::All).build())
        .unwrap_err();
    assert!(matches!(err, WatchError::Config(_)));
    assert_eq!(h.coordinator.get_status().mode, WatchMode::Changed);
}

#[tokio::test(start_paused = true)]
async fn stop_during_a_test_run_is_not_counted_as_a_failure() {
    init_tracing();
    let watcher = FakeWatcher::new();
    let trigger = RecordingTrigger::new().hanging_until_cancelled();
    let coordinator = WatchCoordinator::new(
        WatchConfigBuilder::new().mode(WatchMode::Changed).build(),
        Arc::new(watcher.clone()),
        Arc::new(Debouncer::new(Duration::from_millis(50))),
        Arc::new(trigger.clone()),
    );
    coordinator.start(CancellationToken::new()).unwrap();

    watcher.emit(change("pkg/a.go", ChangeKind::Modified)).await.unwrap();
    with_timeout(trigger.wait_for_calls(1)).await;

    coordinator.stop().unwrap();
    with_timeout(coordinator.join_loop()).await;

    let status = coordinator.get_status();
    assert!(!status.running);
    assert_eq!(status.event_count, 1);
    assert_eq!(status.error_count, 0);
}
