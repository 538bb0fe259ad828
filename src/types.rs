// src/types.rs

//! Shared value types: watch modes, change kinds, file change events and the
//! coordinator status snapshot.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::WatchError;

/// Policy deciding which tests a change should trigger.
///
/// - `All`: every change runs the whole suite.
/// - `Changed`: a change runs the tests of its own package.
/// - `Related`: a change runs its own package plus any package linked to it
///   through the test <-> implementation mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    All,
    Changed,
    Related,
}

impl WatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchMode::All => "all",
            WatchMode::Changed => "changed",
            WatchMode::Related => "related",
        }
    }
}

impl Default for WatchMode {
    fn default() -> Self {
        WatchMode::All
    }
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchMode {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(WatchMode::All),
            "changed" => Ok(WatchMode::Changed),
            "related" => Ok(WatchMode::Related),
            other => Err(WatchError::UnknownMode(other.to_string())),
        }
    }
}

/// Kind of filesystem change carried by a [`FileChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
            ChangeKind::Renamed => write!(f, "renamed"),
        }
    }
}

impl FromStr for ChangeKind {
    type Err = WatchError;

    /// Accepts both the display names and the raw watcher verbs
    /// (`create`, `write`, `remove`, `rename`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" | "create" | "added" => Ok(ChangeKind::Created),
            "modified" | "modify" | "write" => Ok(ChangeKind::Modified),
            "deleted" | "delete" | "remove" | "removed" => Ok(ChangeKind::Deleted),
            "renamed" | "rename" => Ok(ChangeKind::Renamed),
            "" => Err(WatchError::InvalidEvent("event kind is empty".to_string())),
            other => Err(WatchError::InvalidEvent(format!(
                "unknown event kind: {other}"
            ))),
        }
    }
}

/// A single observed filesystem change.
///
/// Immutable once built; [`FileChangeEvent::new`] rejects events with an
/// empty path so invalid events never enter the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    path: PathBuf,
    kind: ChangeKind,
    observed_at: DateTime<Utc>,
    is_test_file: bool,
}

impl FileChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Result<Self, WatchError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(WatchError::InvalidEvent("event path is empty".to_string()));
        }
        Ok(Self {
            path,
            kind,
            observed_at: Utc::now(),
            is_test_file: false,
        })
    }

    /// Mark whether the changed file is a test file.
    pub fn with_test_file(mut self, is_test_file: bool) -> Self {
        self.is_test_file = is_test_file;
        self
    }

    /// Override the observation timestamp (watchers that batch events
    /// record the time they saw the change, not the time they forwarded it).
    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn is_test_file(&self) -> bool {
        self.is_test_file
    }
}

/// A batch of deduplicated events flushed after one quiet period.
pub type EventBatch = Vec<FileChangeEvent>;

/// Point-in-time snapshot of the coordinator.
///
/// Always handed out by value; the live copy stays behind the coordinator
/// lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchStatus {
    pub running: bool,
    pub watched_paths: Vec<PathBuf>,
    pub mode: WatchMode,
    pub started_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub event_count: u64,
    pub error_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_mode_parses_case_insensitively() {
        assert_eq!("Related".parse::<WatchMode>().unwrap(), WatchMode::Related);
        assert_eq!(" all ".parse::<WatchMode>().unwrap(), WatchMode::All);
        assert!(matches!(
            "sometimes".parse::<WatchMode>(),
            Err(WatchError::UnknownMode(m)) if m == "sometimes"
        ));
    }

    #[test]
    fn change_kind_accepts_watcher_verbs() {
        assert_eq!("write".parse::<ChangeKind>().unwrap(), ChangeKind::Modified);
        assert_eq!("create".parse::<ChangeKind>().unwrap(), ChangeKind::Created);
        assert_eq!("remove".parse::<ChangeKind>().unwrap(), ChangeKind::Deleted);
        assert!("".parse::<ChangeKind>().is_err());
        assert!("chmod".parse::<ChangeKind>().is_err());
    }

    #[test]
    fn event_with_empty_path_is_rejected() {
        let err = FileChangeEvent::new("", ChangeKind::Modified).unwrap_err();
        assert!(matches!(err, WatchError::InvalidEvent(_)));
    }

    #[test]
    fn default_status_is_zeroed() {
        let status = WatchStatus::default();
        assert!(!status.running);
        assert!(status.watched_paths.is_empty());
        assert_eq!(status.started_at, None);
        assert_eq!(status.last_event_at, None);
        assert_eq!(status.event_count, 0);
        assert_eq!(status.error_count, 0);
    }
}
