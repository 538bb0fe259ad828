// src/exec/command.rs

use std::process::Stdio;

use anyhow::{Context, bail};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{RunFuture, TestRunOutput, TestRunner};

/// Placeholder replaced by the space-separated targets.
pub const TARGETS_PLACEHOLDER: &str = "{targets}";

/// Runs a shell command template once per request.
///
/// `go test {targets}` with targets `["./a", "./b"]` runs
/// `go test ./a ./b`. Without a placeholder the targets are appended.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    template: String,
}

impl CommandTestRunner {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn command_line(&self, targets: &[String]) -> String {
        let joined = targets.join(" ");
        if self.template.contains(TARGETS_PLACEHOLDER) {
            self.template.replace(TARGETS_PLACEHOLDER, &joined)
        } else if joined.is_empty() {
            self.template.clone()
        } else {
            format!("{} {}", self.template, joined)
        }
    }
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

impl TestRunner for CommandTestRunner {
    fn run(&self, cancel: CancellationToken, targets: Vec<String>) -> RunFuture<'_> {
        let line = self.command_line(&targets);

        Box::pin(async move {
            info!(cmd = %line, ?targets, "starting test command");

            let mut cmd = shell_command(&line);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let child = cmd
                .spawn()
                .with_context(|| format!("spawning test command '{line}'"))?;

            // Dropping the wait future on cancellation kills the child.
            let output = tokio::select! {
                res = child.wait_with_output() => {
                    res.with_context(|| format!("waiting for test command '{line}'"))?
                }
                _ = cancel.cancelled() => {
                    warn!(cmd = %line, "test command cancelled");
                    bail!("test command '{line}' cancelled");
                }
            };

            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));

            let code = output.status.code();
            debug!(cmd = %line, exit_code = ?code, "test command exited");

            Ok(if output.status.success() {
                TestRunOutput::passed(text)
            } else {
                TestRunOutput::failed(text, code)
            })
        })
    }
}
