// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{AppConfig, RawConfigFile, load_or_default};
use crate::console::Console;
use crate::engine::{TestRunDriver, TestTrigger, WatchCoordinator};
use crate::exec::CommandTestRunner;
use crate::watch::{ConventionFinder, Debouncer, NotifyWatcher};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + CLI overrides)
/// - notify watcher, debouncer and coordinator
/// - test runner, finder and console driver
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let watch = cfg.watch.clone();

    let finder = Arc::new(ConventionFinder::on_disk(&watch.test_patterns)?);
    let runner = Arc::new(CommandTestRunner::new(cfg.runner.command.clone()));
    let driver = Arc::new(TestRunDriver::new(
        runner,
        finder,
        Arc::new(Console::stdout()),
        cfg.runner.all_target.clone(),
    ));

    let coordinator = WatchCoordinator::new(
        watch.clone(),
        Arc::new(NotifyWatcher::from_config(&watch)?),
        Arc::new(Debouncer::new(watch.debounce_interval)),
        driver.clone(),
    );

    let cancel = CancellationToken::new();
    coordinator.start(cancel.clone())?;

    if watch.runs_suite_on_start() {
        if let Err(err) = driver.trigger_all_tests(cancel.child_token()).await {
            warn!(error = %err, "initial test run failed");
        }
    }

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Ctrl-C received; shutting down"),
                Err(err) => warn!(error = %err, "failed to listen for Ctrl-C; shutting down"),
            }
        }
        _ = coordinator.join_loop() => info!("watch loop ended"),
    }

    cancel.cancel();
    coordinator.stop()?;

    let status = coordinator.get_status();
    info!(
        events = status.event_count,
        errors = status.error_count,
        "testwatch finished"
    );
    Ok(())
}

/// Config file (or defaults when it is missing) with CLI overrides applied,
/// then validated.
pub fn resolve_config(args: &CliArgs) -> errors::Result<AppConfig> {
    let mut raw = load_or_default(&args.config)?;
    apply_cli_overrides(&mut raw, args);
    AppConfig::try_from(raw)
}

fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if !args.paths.is_empty() {
        raw.watch.paths = args.paths.clone();
    }
    if let Some(mode) = &args.mode {
        raw.watch.mode = Some(mode.clone());
    }
    if let Some(ms) = args.debounce_ms {
        raw.watch.debounce_ms = Some(ms);
    }
    if let Some(cmd) = &args.command {
        raw.runner.command = cmd.clone();
    }
    raw.watch.clear_screen |= args.clear;
    raw.watch.run_on_start |= args.run_on_start;
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &AppConfig) {
    let watch = &cfg.watch;
    println!("testwatch dry-run");
    println!("  watch.paths = {:?}", watch.paths);
    println!("  watch.mode = {}", watch.mode);
    println!("  watch.debounce = {:?}", watch.debounce_interval);
    println!("  watch.ignore = {:?}", watch.ignore_patterns);
    println!("  watch.test_patterns = {:?}", watch.test_patterns);
    if watch.clear_screen_on_change {
        println!("  watch.clear_screen = true");
    }
    if watch.run_on_start {
        println!("  watch.run_on_start = true");
    }
    println!("  runner.command = {}", cfg.runner.command);
    println!("  runner.all_target = {}", cfg.runner.all_target);
}
