#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use testwatch::config::WatchConfiguration;
use testwatch::types::{ChangeKind, FileChangeEvent, WatchMode};

/// Builder for `WatchConfiguration` to simplify test setup.
pub struct WatchConfigBuilder {
    config: WatchConfiguration,
}

impl WatchConfigBuilder {
    /// Watches `./src` in `All` mode with a 50 ms quiet period.
    pub fn new() -> Self {
        Self {
            config: WatchConfiguration::new(vec![PathBuf::from("./src")])
                .with_debounce(Duration::from_millis(50)),
        }
    }

    pub fn paths(mut self, paths: &[&str]) -> Self {
        self.config.paths = paths.iter().map(PathBuf::from).collect();
        self
    }

    pub fn mode(mut self, mode: WatchMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_interval = Duration::from_millis(ms);
        self
    }

    pub fn test_patterns(mut self, patterns: &[&str]) -> Self {
        self.config.test_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn clear_screen(mut self, clear: bool) -> Self {
        self.config.clear_screen_on_change = clear;
        self
    }

    pub fn build(self) -> WatchConfiguration {
        self.config
    }
}

impl Default for WatchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A change event for `path`.
pub fn change(path: &str, kind: ChangeKind) -> FileChangeEvent {
    FileChangeEvent::new(path, kind).expect("test event paths are non-empty")
}

/// A `Modified` event for a test file.
pub fn test_change(path: &str) -> FileChangeEvent {
    change(path, ChangeKind::Modified).with_test_file(true)
}

/// A batch of `Modified` events.
pub fn modified_batch(paths: &[&str]) -> Vec<FileChangeEvent> {
    paths
        .iter()
        .map(|p| change(p, ChangeKind::Modified))
        .collect()
}
