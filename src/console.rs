// src/console.rs

//! Human-facing console output: timestamped status lines and screen
//! clearing. Logs go to stderr through `tracing`; this writes to stdout.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use chrono::{DateTime, Local};

use crate::lock_unpoisoned;

/// ANSI "clear screen, cursor home".
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Console {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// `[HH:MM:SS] msg`
    pub fn status(&self, msg: &str) -> io::Result<()> {
        self.status_at(Local::now(), msg)
    }

    pub fn status_at(&self, at: DateTime<Local>, msg: &str) -> io::Result<()> {
        self.write_raw(&format_status(at, msg))
    }

    pub fn clear(&self) -> io::Result<()> {
        self.write_raw(CLEAR_SCREEN)
    }

    /// Write `text` verbatim (command output), adding a trailing newline if
    /// it lacks one.
    pub fn print_block(&self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if text.ends_with('\n') {
            self.write_raw(text)
        } else {
            self.write_raw(&format!("{text}\n"))
        }
    }

    fn write_raw(&self, text: &str) -> io::Result<()> {
        let mut out = lock_unpoisoned(&self.out);
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

pub fn format_status(at: DateTime<Local>, msg: &str) -> String {
    format!("[{}] {}\n", at.format("%H:%M:%S"), msg)
}
