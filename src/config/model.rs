// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{Result, WatchError};
use crate::types::WatchMode;

/// Quiet period used when none (or zero) is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Target handed to the runner when the whole suite should run.
pub const DEFAULT_ALL_TARGET: &str = "./...";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// paths = ["./src"]
/// ignore = ["**/generated/**"]
/// test_patterns = ["*_test.go"]
/// mode = "changed"
/// debounce_ms = 250
/// clear_screen = false
/// run_on_start = true
///
/// [runner]
/// command = "go test {targets}"
/// ```
///
/// Both sections are optional; CLI flags can fill in what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: RawWatchSection,

    #[serde(default)]
    pub runner: RunnerSection,
}

/// `[watch]` section, before validation.
///
/// `mode` stays a string and `debounce_ms` signed so that bad values are
/// reported as configuration errors instead of opaque parse failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWatchSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub test_patterns: Vec<String>,

    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub debounce_ms: Option<i64>,

    #[serde(default)]
    pub clear_screen: bool,

    #[serde(default)]
    pub run_on_start: bool,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Shell command template. `{targets}` is replaced with the
    /// space-separated targets; without it the targets are appended.
    #[serde(default = "default_command")]
    pub command: String,

    /// Target used for "run everything".
    #[serde(default = "default_all_target")]
    pub all_target: String,
}

fn default_command() -> String {
    "go test {targets}".to_string()
}

fn default_all_target() -> String {
    DEFAULT_ALL_TARGET.to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            all_target: default_all_target(),
        }
    }
}

/// Validated watch settings handed to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfiguration {
    pub paths: Vec<PathBuf>,
    pub ignore_patterns: Vec<String>,
    pub test_patterns: Vec<String>,
    pub mode: WatchMode,
    pub debounce_interval: Duration,
    pub clear_screen_on_change: bool,
    pub run_on_start: bool,
}

impl WatchConfiguration {
    /// Configuration watching `paths` with every other field defaulted.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            ignore_patterns: default_ignore_patterns(),
            test_patterns: default_test_patterns(),
            mode: WatchMode::default(),
            debounce_interval: DEFAULT_DEBOUNCE,
            clear_screen_on_change: false,
            run_on_start: false,
        }
    }

    pub fn with_mode(mut self, mode: WatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_debounce(mut self, interval: Duration) -> Self {
        self.debounce_interval = interval;
        self
    }

    /// Whether the whole suite runs once right after startup.
    pub fn runs_suite_on_start(&self) -> bool {
        self.run_on_start || self.mode == WatchMode::All
    }

    /// Check the invariants the coordinator relies on.
    ///
    /// Mode is a closed enum and the interval a `Duration`, so only the path
    /// list can be wrong at this point.
    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(WatchError::Config(
                "watch configuration must specify at least one path".to_string(),
            ));
        }
        if let Some(empty) = self.paths.iter().find(|p| p.as_os_str().is_empty()) {
            return Err(WatchError::Config(format!(
                "watch paths must not be empty (got {:?})",
                empty
            )));
        }
        Ok(())
    }
}

pub fn default_test_patterns() -> Vec<String> {
    vec!["*_test.*".to_string()]
}

pub fn default_ignore_patterns() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/vendor/**".to_string(),
    ]
}

/// Fully validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub watch: WatchConfiguration,
    pub runner: RunnerSection,
}
