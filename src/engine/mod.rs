// src/engine/mod.rs

//! Watch coordination engine.
//!
//! - [`coordinator`] owns the lifecycle, status and the event loop that
//!   pumps raw events into the debouncer and batches into the trigger.
//! - [`selector`] decides which packages a change maps to.
//! - [`driver`] is the production [`TestTrigger`], running tests through
//!   an [`crate::exec::TestRunner`] and reporting on the console.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::config::WatchConfiguration;
use crate::types::FileChangeEvent;

pub mod coordinator;
pub mod driver;
pub mod selector;

pub use coordinator::{RAW_EVENT_CAPACITY, WatchCoordinator};
pub use driver::TestRunDriver;
pub use selector::{Selection, dedup_targets, package_of, targets_for_change};

/// Future returned by the [`TestTrigger`] methods.
pub type TriggerFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Collaborator the coordinator hands changes to.
///
/// Each method is called once per change according to the active
/// [`crate::types::WatchMode`]; an `Err` stops the rest of the batch.
pub trait TestTrigger: Send + Sync + fmt::Debug {
    /// `Changed` mode: tests scoped to the file's own package.
    fn trigger_tests_for_file<'a>(
        &'a self,
        cancel: CancellationToken,
        change: &'a FileChangeEvent,
    ) -> TriggerFuture<'a>;

    /// `Related` mode: own package plus packages linked through the
    /// test <-> implementation mapping.
    fn trigger_related_tests<'a>(
        &'a self,
        cancel: CancellationToken,
        change: &'a FileChangeEvent,
    ) -> TriggerFuture<'a>;

    /// `All` mode: the whole suite.
    fn trigger_all_tests(&self, cancel: CancellationToken) -> TriggerFuture<'_>;

    /// Called once before a non-empty batch is dispatched, with the
    /// configuration active for that batch.
    fn batch_started(&self, _config: &WatchConfiguration, _batch: &[FileChangeEvent]) {}
}
