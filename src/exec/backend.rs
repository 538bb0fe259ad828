// src/exec/backend.rs

//! Pluggable test-execution abstraction.
//!
//! The driver talks to a `TestRunner` instead of spawning processes itself.
//! Production code uses [`super::command::CommandTestRunner`]; tests plug in
//! a fake that records the requested targets.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Future returned by [`TestRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<TestRunOutput>> + Send + 'a>>;

/// Result of one test command invocation.
///
/// Failing tests are a normal outcome (`success == false`), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestRunOutput {
    pub output: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

impl TestRunOutput {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            exit_code: Some(0),
        }
    }

    pub fn failed(output: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            output: output.into(),
            success: false,
            exit_code,
        }
    }
}

/// Test-execution collaborator.
///
/// `targets` are resolved package directories (or the configured
/// "whole suite" target). An `Err` means the command could not be run.
pub trait TestRunner: Send + Sync + fmt::Debug {
    fn run(&self, cancel: CancellationToken, targets: Vec<String>) -> RunFuture<'_>;
}
