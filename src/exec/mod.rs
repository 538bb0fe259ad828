// src/exec/mod.rs

//! Test execution layer.
//!
//! - [`backend`] defines the `TestRunner` trait the driver talks to.
//! - [`command`] runs a shell command template via `tokio::process`.

pub mod backend;
pub mod command;

pub use backend::{RunFuture, TestRunOutput, TestRunner};
pub use command::CommandTestRunner;
