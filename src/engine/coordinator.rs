// src/engine/coordinator.rs

use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::Utc;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfiguration;
use crate::errors::{Result, WatchError};
use crate::lock_unpoisoned;
use crate::types::{EventBatch, FileChangeEvent, WatchMode, WatchStatus};
use crate::watch::debouncer::{BatchReceiver, EventDebouncer};
use crate::watch::watcher::FileSystemWatcher;

use super::TestTrigger;

/// Capacity of the raw event queue between the watcher and the loop.
pub const RAW_EVENT_CAPACITY: usize = 100;

/// Orchestrates one watch session.
///
/// Owns the watcher, debouncer and trigger collaborators and a single
/// background loop that:
/// - feeds raw watcher events into the debouncer (counting them),
/// - hands every debounced batch to [`WatchCoordinator::handle_file_changes`],
/// - exits on [`WatchCoordinator::stop`] or external cancellation.
///
/// All mutable state lives behind one lock that is never held across an
/// `.await`. The debouncer's batch stream can only be taken once, so a
/// coordinator serves a single start/stop cycle per debouncer.
#[derive(Clone)]
pub struct WatchCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    watcher: Arc<dyn FileSystemWatcher>,
    debouncer: Arc<dyn EventDebouncer>,
    trigger: Arc<dyn TestTrigger>,
    state: Mutex<CoordinatorState>,
}

struct CoordinatorState {
    config: WatchConfiguration,
    status: WatchStatus,
    /// Batch stream taken from the debouncer but not yet handed to a loop.
    batches: Option<BatchReceiver>,
    /// Cancelled by `stop`; a child of the token passed to `start`.
    run_token: Option<CancellationToken>,
    loop_handle: Option<JoinHandle<()>>,
}

impl fmt::Debug for WatchCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_unpoisoned(&self.inner.state);
        f.debug_struct("WatchCoordinator")
            .field("status", &state.status)
            .field("watcher", &self.inner.watcher)
            .field("debouncer", &self.inner.debouncer)
            .finish_non_exhaustive()
    }
}

impl WatchCoordinator {
    pub fn new(
        config: WatchConfiguration,
        watcher: Arc<dyn FileSystemWatcher>,
        debouncer: Arc<dyn EventDebouncer>,
        trigger: Arc<dyn TestTrigger>,
    ) -> Self {
        debouncer.set_interval(config.debounce_interval);
        let status = WatchStatus {
            mode: config.mode,
            ..WatchStatus::default()
        };

        Self {
            inner: Arc::new(Inner {
                watcher,
                debouncer,
                trigger,
                state: Mutex::new(CoordinatorState {
                    config,
                    status,
                    batches: None,
                    run_token: None,
                    loop_handle: None,
                }),
            }),
        }
    }

    /// Begin watching and launch the event loop.
    ///
    /// Must be called from within a Tokio runtime. A watcher that fails
    /// while starting up is reported here (and counted); failures after
    /// that are logged and counted by the background task. Cancellation of
    /// `cancel` is never reported as an error.
    pub fn start(&self, cancel: CancellationToken) -> Result<()> {
        let runtime = Handle::try_current().map_err(|e| WatchError::Other(anyhow!(e)))?;

        let mut state = lock_unpoisoned(&self.inner.state);
        if state.status.running {
            return Err(WatchError::AlreadyRunning);
        }
        state.config.validate()?;

        let batches = match state.batches.take() {
            Some(rx) => rx,
            None => self.inner.debouncer.events().ok_or_else(|| WatchError::Debouncer {
                op: "subscribe",
                source: anyhow!("debouncer batch stream was already taken"),
            })?,
        };

        let run_token = cancel.child_token();
        let (raw_tx, raw_rx) = mpsc::channel::<FileChangeEvent>(RAW_EVENT_CAPACITY);
        let mut watch = self.inner.watcher.watch(run_token.clone(), raw_tx);

        match (&mut watch).now_or_never() {
            Some(Err(source)) if !run_token.is_cancelled() => {
                state.status.error_count += 1;
                state.batches = Some(batches);
                return Err(WatchError::Watcher { op: "watch", source });
            }
            Some(_) => debug!("file watcher finished during startup"),
            None => {
                let inner = Arc::clone(&self.inner);
                let token = run_token.clone();
                runtime.spawn(async move {
                    match watch.await {
                        Ok(()) => debug!("file watcher finished"),
                        Err(err) if token.is_cancelled() => {
                            debug!(error = %err, "file watcher ended after cancellation");
                        }
                        Err(err) => {
                            error!(error = %err, "file watcher failed");
                            inner.record_error();
                        }
                    }
                });
            }
        }

        state.status.running = true;
        state.status.started_at = Some(Utc::now());
        state.status.watched_paths = state.config.paths.clone();
        state.status.mode = state.config.mode;
        state.run_token = Some(run_token.clone());
        state.loop_handle = Some(runtime.spawn(run_loop(
            Arc::clone(&self.inner),
            raw_rx,
            batches,
            run_token,
            cancel,
        )));

        info!(
            paths = ?state.status.watched_paths,
            mode = %state.status.mode,
            "watch coordinator started"
        );
        Ok(())
    }

    /// Stop watching. Calling it on a stopped coordinator is a no-op.
    ///
    /// Debouncer and watcher shutdown failures are both attempted and
    /// reported together as [`WatchError::Shutdown`].
    pub fn stop(&self) -> Result<()> {
        let run_token = {
            let mut state = lock_unpoisoned(&self.inner.state);
            if !state.status.running {
                return Ok(());
            }
            state.status.running = false;
            state.run_token.take()
        };

        if let Some(token) = run_token {
            token.cancel();
        }

        let mut failures = Vec::new();
        if let Err(source) = self.inner.debouncer.stop() {
            failures.push(WatchError::Debouncer { op: "stop", source });
        }
        if let Err(source) = self.inner.watcher.close() {
            failures.push(WatchError::Watcher { op: "close", source });
        }

        if failures.is_empty() {
            info!("watch coordinator stopped");
            return Ok(());
        }

        lock_unpoisoned(&self.inner.state).status.error_count += failures.len() as u64;
        warn!(failures = failures.len(), "watch coordinator stopped with errors");
        Err(WatchError::Shutdown(failures))
    }

    /// Dispatch one batch to the trigger according to the active mode.
    ///
    /// A trigger that fails after `stop` (or external cancellation) was
    /// interrupted, not broken: the rest of the batch is skipped and
    /// nothing is counted.
    pub async fn handle_file_changes(&self, batch: EventBatch) -> Result<()> {
        self.inner.handle_file_changes(batch).await
    }

    /// Replace the configuration.
    ///
    /// The new debounce interval applies from the next debounce cycle.
    /// Watched paths are not changed until the next start.
    pub fn configure(&self, config: WatchConfiguration) -> Result<()> {
        config.validate()?;
        let interval = config.debounce_interval;
        {
            let mut state = lock_unpoisoned(&self.inner.state);
            state.status.mode = config.mode;
            state.config = config;
        }
        self.inner.debouncer.set_interval(interval);
        debug!(?interval, "watch configuration replaced");
        Ok(())
    }

    pub fn get_status(&self) -> WatchStatus {
        lock_unpoisoned(&self.inner.state).status.clone()
    }

    pub fn config(&self) -> WatchConfiguration {
        lock_unpoisoned(&self.inner.state).config.clone()
    }

    pub fn is_running(&self) -> bool {
        lock_unpoisoned(&self.inner.state).status.running
    }

    /// Token cancelled by `stop`, for work started on behalf of this run.
    pub fn run_token(&self) -> Option<CancellationToken> {
        lock_unpoisoned(&self.inner.state).run_token.clone()
    }

    /// Wait for the background loop of the current or last run to exit.
    pub async fn join_loop(&self) {
        let handle = lock_unpoisoned(&self.inner.state).loop_handle.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "watch loop task ended abnormally");
            }
        }
    }
}

impl Inner {
    fn record_error(&self) {
        lock_unpoisoned(&self.state).status.error_count += 1;
    }

    fn record_event(&self) {
        lock_unpoisoned(&self.state).status.event_count += 1;
    }

    async fn handle_file_changes(&self, batch: EventBatch) -> Result<()> {
        let (config, cancel) = {
            let mut state = lock_unpoisoned(&self.state);
            if !state.status.running {
                return Err(WatchError::NotRunning);
            }
            state.status.last_event_at = Some(Utc::now());
            (state.config.clone(), state.run_token.clone().unwrap_or_default())
        };

        if batch.is_empty() {
            return Ok(());
        }

        let mode = config.mode;
        debug!(%mode, changes = batch.len(), "handling file changes");
        self.trigger.batch_started(&config, &batch);

        for change in &batch {
            let res = match mode {
                WatchMode::All => self.trigger.trigger_all_tests(cancel.clone()).await,
                WatchMode::Changed => {
                    self.trigger
                        .trigger_tests_for_file(cancel.clone(), change)
                        .await
                }
                WatchMode::Related => {
                    self.trigger
                        .trigger_related_tests(cancel.clone(), change)
                        .await
                }
            };

            if let Err(source) = res {
                if cancel.is_cancelled() {
                    debug!(
                        path = ?change.path(),
                        error = %source,
                        "test trigger interrupted by shutdown"
                    );
                    return Ok(());
                }
                self.record_error();
                return Err(WatchError::Trigger {
                    path: change.path().to_path_buf(),
                    mode: mode.as_str(),
                    source,
                });
            }
        }

        Ok(())
    }
}

async fn run_loop(
    inner: Arc<Inner>,
    mut raw_rx: mpsc::Receiver<FileChangeEvent>,
    mut batches: BatchReceiver,
    stop: CancellationToken,
    cancel: CancellationToken,
) {
    info!("watch loop started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("watch loop cancelled");
                break;
            }
            _ = stop.cancelled() => {
                debug!("watch loop stop requested");
                break;
            }
            Some(event) = raw_rx.recv() => {
                debug!(path = ?event.path(), kind = %event.kind(), "raw file event");
                inner.record_event();
                inner.debouncer.add_event(event);
            }
            maybe_batch = batches.recv() => {
                let Some(batch) = maybe_batch else {
                    debug!("debouncer batch stream closed");
                    break;
                };
                // Already counted inside handle_file_changes.
                if let Err(err) = inner.handle_file_changes(batch).await {
                    warn!(error = %err, "handling file changes failed");
                }
            }
        }
    }

    info!("watch loop exiting");
}
