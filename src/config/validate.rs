// src/config/validate.rs

use std::time::Duration;

use globset::Glob;

use crate::config::model::{
    default_ignore_patterns, default_test_patterns, AppConfig, RawConfigFile, RawWatchSection,
    RunnerSection, WatchConfiguration, DEFAULT_DEBOUNCE,
};
use crate::errors::{Result, WatchError};
use crate::types::WatchMode;

impl TryFrom<RawConfigFile> for AppConfig {
    type Error = WatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let watch = WatchConfiguration::try_from(raw.watch)?;
        validate_runner(&raw.runner)?;
        Ok(AppConfig {
            watch,
            runner: raw.runner,
        })
    }
}

impl TryFrom<RawWatchSection> for WatchConfiguration {
    type Error = WatchError;

    fn try_from(raw: RawWatchSection) -> std::result::Result<Self, Self::Error> {
        let mode = match raw.mode.as_deref() {
            Some(s) => s.parse::<WatchMode>()?,
            None => WatchMode::default(),
        };

        let debounce_interval = debounce_from_millis(raw.debounce_ms)?;

        validate_patterns("ignore", &raw.ignore)?;
        validate_patterns("test_patterns", &raw.test_patterns)?;

        let ignore_patterns = if raw.ignore.is_empty() {
            default_ignore_patterns()
        } else {
            raw.ignore
        };

        let test_patterns = if raw.test_patterns.is_empty() {
            default_test_patterns()
        } else {
            raw.test_patterns
        };

        let cfg = WatchConfiguration {
            paths: raw.paths,
            ignore_patterns,
            test_patterns,
            mode,
            debounce_interval,
            clear_screen_on_change: raw.clear_screen,
            run_on_start: raw.run_on_start,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Turn the raw millisecond setting into a quiet period.
///
/// Negative values are rejected; missing or zero values fall back to
/// [`DEFAULT_DEBOUNCE`].
pub fn debounce_from_millis(ms: Option<i64>) -> Result<Duration> {
    match ms {
        None | Some(0) => Ok(DEFAULT_DEBOUNCE),
        Some(ms) if ms < 0 => Err(WatchError::Config(format!(
            "[watch].debounce_ms cannot be negative (got {ms})"
        ))),
        Some(ms) => Ok(Duration::from_millis(ms as u64)),
    }
}

fn validate_patterns(field: &str, patterns: &[String]) -> Result<()> {
    for pat in patterns {
        Glob::new(pat).map_err(|e| {
            WatchError::Config(format!("[watch].{field} has invalid glob {pat:?}: {e}"))
        })?;
    }
    Ok(())
}

fn validate_runner(runner: &RunnerSection) -> Result<()> {
    if runner.command.trim().is_empty() {
        return Err(WatchError::Config(
            "[runner].command must not be empty".to_string(),
        ));
    }
    if runner.all_target.trim().is_empty() {
        return Err(WatchError::Config(
            "[runner].all_target must not be empty".to_string(),
        ));
    }
    Ok(())
}
