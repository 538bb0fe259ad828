// src/watch/watcher.rs

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchConfiguration;
use crate::lock_unpoisoned;
use crate::types::{ChangeKind, FileChangeEvent};
use crate::watch::patterns::PatternSet;

/// Future returned by [`FileSystemWatcher::watch`].
///
/// It owns everything it needs so the coordinator can spawn it.
pub type WatchFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Source of raw file-change events.
///
/// `watch` resolves once `cancel` fires, the watcher is closed, or a fatal
/// error occurs. Setup errors must be reported on the first poll.
pub trait FileSystemWatcher: Send + Sync + fmt::Debug {
    fn watch(&self, cancel: CancellationToken, out: mpsc::Sender<FileChangeEvent>) -> WatchFuture;

    fn add_path(&self, path: &Path) -> Result<()>;

    fn remove_path(&self, path: &Path) -> Result<()>;

    /// Release the OS watch handles. Calling it twice is fine.
    fn close(&self) -> Result<()>;
}

/// Turns notify events into [`FileChangeEvent`]s.
#[derive(Debug, Clone)]
pub struct EventFilter {
    ignore: PatternSet,
    test_patterns: PatternSet,
}

impl EventFilter {
    pub fn new(ignore: &[String], test_patterns: &[String]) -> Result<Self> {
        Ok(Self {
            ignore: PatternSet::new(ignore)?,
            test_patterns: PatternSet::new(test_patterns)?,
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.is_match(path)
    }

    /// Access and metadata-only notifications carry no content change and
    /// map to `None`.
    pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            EventKind::Remove(_) => Some(ChangeKind::Deleted),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    pub fn translate(&self, event: &Event) -> Vec<FileChangeEvent> {
        let Some(kind) = Self::classify(&event.kind) else {
            return Vec::new();
        };

        event
            .paths
            .iter()
            .filter(|path| !self.is_ignored(path))
            // Deleted paths no longer exist, so only live directories can be told apart.
            .filter(|path| kind == ChangeKind::Deleted || !path.is_dir())
            .filter_map(|path| match FileChangeEvent::new(path.clone(), kind) {
                Ok(ev) => Some(ev.with_test_file(self.test_patterns.is_match(path))),
                Err(err) => {
                    debug!(error = %err, "dropping invalid notify event");
                    None
                }
            })
            .collect()
    }
}

/// [`FileSystemWatcher`] backed by `notify::RecommendedWatcher`.
///
/// Every configured path is watched recursively. The underlying handle is
/// created when the watch future is first polled and lives until
/// [`FileSystemWatcher::close`] is called.
pub struct NotifyWatcher {
    paths: Arc<Mutex<Vec<PathBuf>>>,
    filter: EventFilter,
    inner: Arc<Mutex<Option<RecommendedWatcher>>>,
}

impl fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("paths", &*lock_unpoisoned(&self.paths))
            .field("active", &lock_unpoisoned(&self.inner).is_some())
            .finish_non_exhaustive()
    }
}

impl NotifyWatcher {
    pub fn new(paths: Vec<PathBuf>, ignore: &[String], test_patterns: &[String]) -> Result<Self> {
        Ok(Self {
            paths: Arc::new(Mutex::new(paths)),
            filter: EventFilter::new(ignore, test_patterns)?,
            inner: Arc::new(Mutex::new(None)),
        })
    }

    pub fn from_config(cfg: &WatchConfiguration) -> Result<Self> {
        Self::new(cfg.paths.clone(), &cfg.ignore_patterns, &cfg.test_patterns)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        lock_unpoisoned(&self.paths).clone()
    }
}

fn build_watcher(
    paths: &[PathBuf],
    raw_tx: mpsc::UnboundedSender<Event>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if raw_tx.send(event).is_err() {
                    debug!("notify event arrived after the watch loop ended");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    for path in paths {
        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("watching {:?}", path))?;
    }

    Ok(watcher)
}

impl FileSystemWatcher for NotifyWatcher {
    fn watch(&self, cancel: CancellationToken, out: mpsc::Sender<FileChangeEvent>) -> WatchFuture {
        let paths = self.paths();
        let filter = self.filter.clone();
        let inner = Arc::clone(&self.inner);

        Box::pin(async move {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();
            let watcher = build_watcher(&paths, raw_tx)?;
            *lock_unpoisoned(&inner) = Some(watcher);
            info!(?paths, "file watcher started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("file watcher cancelled");
                        return Ok(());
                    }
                    maybe_event = raw_rx.recv() => {
                        let Some(event) = maybe_event else {
                            debug!("file watcher closed");
                            return Ok(());
                        };
                        debug!(?event, "received notify event");

                        for change in filter.translate(&event) {
                            tokio::select! {
                                _ = cancel.cancelled() => return Ok(()),
                                sent = out.send(change) => {
                                    if sent.is_err() {
                                        debug!("event receiver dropped; stopping file watcher");
                                        return Ok(());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    fn add_path(&self, path: &Path) -> Result<()> {
        if let Some(watcher) = lock_unpoisoned(&self.inner).as_mut() {
            watcher
                .watch(path, RecursiveMode::Recursive)
                .with_context(|| format!("watching {:?}", path))?;
        }
        let mut paths = lock_unpoisoned(&self.paths);
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        if let Some(watcher) = lock_unpoisoned(&self.inner).as_mut() {
            watcher
                .unwatch(path)
                .with_context(|| format!("unwatching {:?}", path))?;
        }
        lock_unpoisoned(&self.paths).retain(|p| p != path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if lock_unpoisoned(&self.inner).take().is_some() {
            info!("file watcher closed");
        }
        Ok(())
    }
}
