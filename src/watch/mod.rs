// src/watch/mod.rs

//! Everything between the OS and the coordinator loop: the notify-backed
//! watcher, event debouncing, glob matching and test-file discovery.

pub mod debouncer;
pub mod finder;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debouncer::{BatchReceiver, Debouncer, EventDebouncer, PendingEvents};
pub use finder::{ConventionFinder, TestFileFinder};
pub use patterns::PatternSet;
pub use watcher::{EventFilter, FileSystemWatcher, NotifyWatcher, WatchFuture};
