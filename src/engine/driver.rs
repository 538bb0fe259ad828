// src/engine/driver.rs

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::WatchConfiguration;
use crate::console::Console;
use crate::exec::TestRunner;
use crate::types::{FileChangeEvent, WatchMode};
use crate::watch::finder::TestFileFinder;

use super::selector::{Selection, target_arg, targets_for_change};
use super::{TestTrigger, TriggerFuture};

/// Production [`TestTrigger`]: resolves targets with the selector, runs
/// them through a [`TestRunner`] and reports on the console.
///
/// Failing tests are reported, not returned as errors; only a runner that
/// cannot run at all fails the trigger.
pub struct TestRunDriver {
    runner: Arc<dyn TestRunner>,
    finder: Arc<dyn TestFileFinder>,
    console: Arc<Console>,
    all_target: String,
}

impl fmt::Debug for TestRunDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRunDriver")
            .field("runner", &self.runner)
            .field("all_target", &self.all_target)
            .finish_non_exhaustive()
    }
}

impl TestRunDriver {
    pub fn new(
        runner: Arc<dyn TestRunner>,
        finder: Arc<dyn TestFileFinder>,
        console: Arc<Console>,
        all_target: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            finder,
            console,
            all_target: all_target.into(),
        }
    }

    fn say(&self, msg: &str) {
        if let Err(err) = self.console.status(msg) {
            warn!(error = %err, "failed to write console status");
        }
    }

    fn targets_for(&self, mode: WatchMode, change: &FileChangeEvent) -> Vec<String> {
        match targets_for_change(mode, self.finder.as_ref(), change.path(), change.is_test_file())
        {
            Selection::Everything => vec![self.all_target.clone()],
            Selection::Packages(packages) => packages.iter().map(|p| target_arg(p)).collect(),
        }
    }

    async fn run_targets(&self, cancel: CancellationToken, targets: Vec<String>) -> Result<()> {
        self.say(&format!("Running tests: {}", targets.join(" ")));

        let outcome = self.runner.run(cancel, targets.clone()).await?;

        if let Err(err) = self.console.print_block(&outcome.output) {
            warn!(error = %err, "failed to write test output");
        }

        if outcome.success {
            self.say("PASS");
        } else {
            match outcome.exit_code {
                Some(code) => self.say(&format!("FAIL (exit code {code})")),
                None => self.say("FAIL"),
            }
        }

        info!(
            ?targets,
            success = outcome.success,
            exit_code = ?outcome.exit_code,
            "test run finished"
        );
        Ok(())
    }
}

impl TestTrigger for TestRunDriver {
    fn trigger_tests_for_file<'a>(
        &'a self,
        cancel: CancellationToken,
        change: &'a FileChangeEvent,
    ) -> TriggerFuture<'a> {
        Box::pin(async move {
            let targets = self.targets_for(WatchMode::Changed, change);
            self.run_targets(cancel, targets).await
        })
    }

    fn trigger_related_tests<'a>(
        &'a self,
        cancel: CancellationToken,
        change: &'a FileChangeEvent,
    ) -> TriggerFuture<'a> {
        Box::pin(async move {
            let targets = self.targets_for(WatchMode::Related, change);
            self.run_targets(cancel, targets).await
        })
    }

    fn trigger_all_tests(&self, cancel: CancellationToken) -> TriggerFuture<'_> {
        Box::pin(async move { self.run_targets(cancel, vec![self.all_target.clone()]).await })
    }

    fn batch_started(&self, config: &WatchConfiguration, batch: &[FileChangeEvent]) {
        if config.clear_screen_on_change {
            if let Err(err) = self.console.clear() {
                warn!(error = %err, "failed to clear screen");
            }
        }

        let names: Vec<String> = batch
            .iter()
            .map(|c| c.path().display().to_string())
            .collect();
        self.say(&format!(
            "{} file(s) changed ({}): {}",
            batch.len(),
            config.mode,
            names.join(", ")
        ));
    }
}
