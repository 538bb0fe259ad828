// src/watch/debouncer.rs

//! Quiet-period debouncer for file change events.
//!
//! Every call to [`EventDebouncer::add_event`] upserts the event into a
//! per-path pending table (last write wins) and re-arms one shared timer.
//! Only when the timer survives a full interval without new events is the
//! whole table drained into a batch and offered to a bounded queue.
//!
//! The offer never blocks: if the queue already holds
//! [`DEFAULT_BATCH_CAPACITY`] unread batches the new batch is dropped. A slow
//! consumer therefore loses batches instead of stalling the timer or the
//! producer.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::lock_unpoisoned;
use crate::types::{EventBatch, FileChangeEvent};

/// Number of unread batches the output queue holds before dropping.
pub const DEFAULT_BATCH_CAPACITY: usize = 10;

/// How long `stop` keeps the output queue open after its final flush.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(10);

/// Read side of the debouncer output queue.
pub type BatchReceiver = mpsc::Receiver<EventBatch>;

/// Temporal grouping of file events.
///
/// Implementations must never block in `add_event`, and `stop` must be
/// idempotent.
pub trait EventDebouncer: Send + Sync + fmt::Debug {
    /// Record an event. A no-op once the debouncer has been stopped.
    fn add_event(&self, event: FileChangeEvent);

    /// Hand out the batch stream. The stream has a single reader, so only
    /// the first call returns `Some`.
    fn events(&self) -> Option<BatchReceiver>;

    /// Change the quiet period. An already armed timer keeps its interval;
    /// the new value applies from the next event onwards.
    fn set_interval(&self, interval: Duration);

    /// Flush what is pending and close the batch stream.
    fn stop(&self) -> anyhow::Result<()>;
}

/// Pending-event table: at most one event per path, always the latest one
/// added since the last drain.
#[derive(Debug, Default)]
pub struct PendingEvents {
    events: HashMap<PathBuf, FileChangeEvent>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for the event's path.
    pub fn upsert(&mut self, event: FileChangeEvent) {
        self.events.insert(event.path().to_path_buf(), event);
    }

    pub fn get(&self, path: &Path) -> Option<&FileChangeEvent> {
        self.events.get(path)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Empty the table, returning its contents in unspecified order.
    pub fn drain(&mut self) -> EventBatch {
        self.events.drain().map(|(_, event)| event).collect()
    }
}

struct DebouncerState {
    interval: Duration,
    pending: PendingEvents,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every re-arm; a timer only flushes if its generation is
    /// still current when it fires.
    generation: u64,
    stopped: bool,
    /// `None` once `stop` has handed the sender to the closing task.
    tx: Option<mpsc::Sender<EventBatch>>,
}

impl DebouncerState {
    fn offer(&self, batch: EventBatch) {
        let Some(tx) = &self.tx else {
            trace!(len = batch.len(), "batch queue already closed; discarding");
            return;
        };

        match tx.try_send(batch) {
            Ok(()) => {}
            Err(TrySendError::Full(batch)) => {
                warn!(
                    dropped = batch.len(),
                    "debounced batch queue is full; dropping batch"
                );
            }
            Err(TrySendError::Closed(batch)) => {
                debug!(
                    dropped = batch.len(),
                    "debounced batch receiver is gone; dropping batch"
                );
            }
        }
    }
}

/// Tokio-backed implementation of [`EventDebouncer`].
///
/// The timer is a spawned task, so `add_event` should be called from within
/// a Tokio runtime. Outside one, events still accumulate and are flushed by
/// `stop`.
pub struct Debouncer {
    state: Arc<Mutex<DebouncerState>>,
    events_rx: Mutex<Option<BatchReceiver>>,
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_unpoisoned(&self.state);
        f.debug_struct("Debouncer")
            .field("interval", &state.interval)
            .field("pending", &state.pending.len())
            .field("stopped", &state.stopped)
            .finish_non_exhaustive()
    }
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self::with_capacity(interval, DEFAULT_BATCH_CAPACITY)
    }

    /// Like [`Debouncer::new`] with a custom output queue capacity.
    pub fn with_capacity(interval: Duration, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let state = DebouncerState {
            interval,
            pending: PendingEvents::new(),
            timer: None,
            generation: 0,
            stopped: false,
            tx: Some(tx),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            events_rx: Mutex::new(Some(rx)),
        }
    }

    /// Current quiet period.
    pub fn interval(&self) -> Duration {
        lock_unpoisoned(&self.state).interval
    }

    /// Number of paths waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        lock_unpoisoned(&self.state).pending.len()
    }

    pub fn is_stopped(&self) -> bool {
        lock_unpoisoned(&self.state).stopped
    }

    fn arm_timer(&self, state: &mut DebouncerState) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation = state.generation.wrapping_add(1);

        let generation = state.generation;
        let interval = state.interval;
        let weak = Arc::downgrade(&self.state);

        match Handle::try_current() {
            Ok(handle) => {
                state.timer = Some(handle.spawn(async move {
                    tokio::time::sleep(interval).await;
                    flush_on_timer(weak, generation);
                }));
            }
            Err(_) => {
                warn!("no Tokio runtime available; events stay pending until stop");
            }
        }
    }
}

/// Timer callback. Races with `stop` are settled under the state lock:
/// whichever side takes the lock second sees the other's effect.
fn flush_on_timer(state: Weak<Mutex<DebouncerState>>, generation: u64) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = lock_unpoisoned(&state);

    if state.stopped || state.generation != generation {
        trace!(generation, "stale or post-stop debounce timer; ignoring");
        return;
    }

    state.timer = None;
    if state.pending.is_empty() {
        return;
    }

    let batch = state.pending.drain();
    debug!(len = batch.len(), "quiet period elapsed; flushing batch");
    state.offer(batch);
}

impl EventDebouncer for Debouncer {
    fn add_event(&self, event: FileChangeEvent) {
        let mut state = lock_unpoisoned(&self.state);
        if state.stopped {
            trace!(path = ?event.path(), "debouncer stopped; ignoring event");
            return;
        }

        trace!(path = ?event.path(), kind = %event.kind(), "debouncing event");
        state.pending.upsert(event);
        self.arm_timer(&mut state);
    }

    fn events(&self) -> Option<BatchReceiver> {
        lock_unpoisoned(&self.events_rx).take()
    }

    fn set_interval(&self, interval: Duration) {
        let mut state = lock_unpoisoned(&self.state);
        debug!(?interval, "debounce interval updated");
        state.interval = interval;
    }

    fn stop(&self) -> anyhow::Result<()> {
        let tx = {
            let mut state = lock_unpoisoned(&self.state);
            if state.stopped {
                return Ok(());
            }
            state.stopped = true;

            if let Some(timer) = state.timer.take() {
                timer.abort();
            }

            if !state.pending.is_empty() {
                let batch = state.pending.drain();
                debug!(len = batch.len(), "flushing pending events on stop");
                state.offer(batch);
            }

            state.tx.take()
        };

        // Keep the queue open briefly so a reader can still pick up the
        // final batch before it sees the stream end.
        if let Some(tx) = tx {
            match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        tokio::time::sleep(SHUTDOWN_GRACE).await;
                        drop(tx);
                    });
                }
                Err(_) => drop(tx),
            }
        }

        Ok(())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = lock_unpoisoned(&self.state).timer.take() {
            timer.abort();
        }
    }
}
