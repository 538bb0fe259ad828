#![allow(dead_code)]

//! Fake collaborators for coordinator and driver tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use testwatch::config::WatchConfiguration;
use testwatch::engine::{TestTrigger, TriggerFuture};
use testwatch::exec::{RunFuture, TestRunOutput, TestRunner};
use testwatch::types::{FileChangeEvent, WatchMode};
use testwatch::watch::{BatchReceiver, Debouncer, EventDebouncer, FileSystemWatcher, WatchFuture};

/// A watcher that:
/// - hands out events pushed with [`FakeWatcher::emit`]
/// - finishes when cancelled or closed
/// - can be told to fail on startup or on close.
#[derive(Debug, Clone, Default)]
pub struct FakeWatcher {
    sender: Arc<Mutex<Option<mpsc::Sender<FileChangeEvent>>>>,
    closed: CancellationToken,
    fail_watch: Arc<Mutex<Option<String>>>,
    fail_close: Arc<Mutex<Option<String>>>,
    close_calls: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_watch(self, msg: &str) -> Self {
        *self.fail_watch.lock().unwrap() = Some(msg.to_string());
        self
    }

    pub fn failing_close(self, msg: &str) -> Self {
        *self.fail_close.lock().unwrap() = Some(msg.to_string());
        self
    }

    /// Push an event as if the OS had reported it.
    pub async fn emit(&self, event: FileChangeEvent) -> Result<()> {
        let tx = self
            .sender
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("fake watcher is not watching"))?;
        tx.send(event).await.map_err(|e| anyhow!("{e}"))
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl FileSystemWatcher for FakeWatcher {
    fn watch(&self, cancel: CancellationToken, out: mpsc::Sender<FileChangeEvent>) -> WatchFuture {
        if let Some(msg) = self.fail_watch.lock().unwrap().clone() {
            return Box::pin(async move { Err(anyhow!(msg)) });
        }

        *self.sender.lock().unwrap() = Some(out);
        let closed = self.closed.clone();
        let sender = Arc::clone(&self.sender);

        Box::pin(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = closed.cancelled() => {}
            }
            sender.lock().unwrap().take();
            Ok(())
        })
    }

    fn add_path(&self, path: &Path) -> Result<()> {
        self.paths.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        self.paths.lock().unwrap().retain(|p| p != path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.cancel();
        match self.fail_close.lock().unwrap().clone() {
            Some(msg) => Err(anyhow!(msg)),
            None => Ok(()),
        }
    }
}

/// One recorded trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerCall {
    All,
    ForFile(PathBuf),
    Related(PathBuf),
}

/// A trigger that records every call and fails on the calls listed in
/// `fail_on` (1-based, counted across all methods).
///
/// With [`RecordingTrigger::hanging_until_cancelled`] every call parks
/// until its token is cancelled and then fails, like a runner killed
/// mid-run.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    calls: Arc<Mutex<Vec<TriggerCall>>>,
    batches: Arc<Mutex<Vec<(WatchMode, Vec<PathBuf>)>>>,
    fail_on: Arc<Mutex<Vec<usize>>>,
    hang: Arc<AtomicBool>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(self, call: usize) -> Self {
        self.fail_on.lock().unwrap().push(call);
        self
    }

    pub fn hanging_until_cancelled(self) -> Self {
        self.hang.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<TriggerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn batches(&self) -> Vec<(WatchMode, Vec<PathBuf>)> {
        self.batches.lock().unwrap().clone()
    }

    /// Poll until at least `n` calls were recorded. Pair with a timeout.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    fn record(&self, cancel: CancellationToken, call: TriggerCall) -> TriggerFuture<'static> {
        let nth = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        };
        let fail = self.fail_on.lock().unwrap().contains(&nth);
        let hang = self.hang.load(Ordering::SeqCst);

        Box::pin(async move {
            if hang {
                cancel.cancelled().await;
                return Err(anyhow!("trigger call {nth} cancelled"));
            }
            if fail {
                return Err(anyhow!("trigger call {nth} failed"));
            }
            Ok(())
        })
    }
}

impl TestTrigger for RecordingTrigger {
    fn trigger_tests_for_file<'a>(
        &'a self,
        cancel: CancellationToken,
        change: &'a FileChangeEvent,
    ) -> TriggerFuture<'a> {
        self.record(cancel, TriggerCall::ForFile(change.path().to_path_buf()))
    }

    fn trigger_related_tests<'a>(
        &'a self,
        cancel: CancellationToken,
        change: &'a FileChangeEvent,
    ) -> TriggerFuture<'a> {
        self.record(cancel, TriggerCall::Related(change.path().to_path_buf()))
    }

    fn trigger_all_tests(&self, cancel: CancellationToken) -> TriggerFuture<'_> {
        self.record(cancel, TriggerCall::All)
    }

    fn batch_started(&self, config: &WatchConfiguration, batch: &[FileChangeEvent]) {
        let paths = batch.iter().map(|c| c.path().to_path_buf()).collect();
        self.batches.lock().unwrap().push((config.mode, paths));
    }
}

/// A runner that records the requested targets and returns a canned
/// outcome (or error).
#[derive(Debug, Clone)]
pub struct FakeRunner {
    runs: Arc<Mutex<Vec<Vec<String>>>>,
    outcome: Arc<Mutex<std::result::Result<TestRunOutput, String>>>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            runs: Arc::default(),
            outcome: Arc::new(Mutex::new(Ok(TestRunOutput::passed("ok\n")))),
        }
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(self, outcome: TestRunOutput) -> Self {
        *self.outcome.lock().unwrap() = Ok(outcome);
        self
    }

    pub fn erroring(self, msg: &str) -> Self {
        *self.outcome.lock().unwrap() = Err(msg.to_string());
        self
    }

    pub fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().unwrap().clone()
    }
}

impl TestRunner for FakeRunner {
    fn run(&self, _cancel: CancellationToken, targets: Vec<String>) -> RunFuture<'_> {
        self.runs.lock().unwrap().push(targets);
        let outcome = self.outcome.lock().unwrap().clone();
        Box::pin(async move { outcome.map_err(|msg| anyhow!(msg)) })
    }
}

/// Real [`Debouncer`] whose `stop` reports an error after doing its work.
#[derive(Debug)]
pub struct FailingStopDebouncer {
    inner: Debouncer,
}

impl FailingStopDebouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Debouncer::new(interval),
        }
    }
}

impl EventDebouncer for FailingStopDebouncer {
    fn add_event(&self, event: FileChangeEvent) {
        self.inner.add_event(event);
    }

    fn events(&self) -> Option<BatchReceiver> {
        self.inner.events()
    }

    fn set_interval(&self, interval: Duration) {
        self.inner.set_interval(interval);
    }

    fn stop(&self) -> Result<()> {
        self.inner.stop()?;
        Err(anyhow!("debouncer stop failed"))
    }
}
