// src/engine/selector.rs

//! Watch-mode target resolution.
//!
//! Pure functions: given a mode, a finder and the changed paths, decide
//! which packages to hand to the test runner. No IO beyond what the
//! [`TestFileFinder`] does.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::types::WatchMode;
use crate::watch::finder::TestFileFinder;
use crate::watch::path_utils::normalized_str;

pub use crate::watch::path_utils::package_of;

/// What a change (or batch) asks the runner to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Run the whole suite.
    Everything,
    /// Run these packages, deduplicated, in first-seen order.
    Packages(Vec<PathBuf>),
}

/// Resolve the targets for a single changed file.
///
/// `is_test` is the watcher's verdict; the finder is consulted as well so
/// hand-built events without the flag resolve the same way.
pub fn targets_for_change(
    mode: WatchMode,
    finder: &dyn TestFileFinder,
    path: &Path,
    is_test: bool,
) -> Selection {
    let is_test = is_test || finder.is_test_file(path);

    let packages = match mode {
        WatchMode::All => return Selection::Everything,
        WatchMode::Changed => vec![changed_target(finder, path, is_test)],
        WatchMode::Related => related_targets(finder, path, is_test),
    };

    Selection::Packages(dedup_targets(packages))
}

fn changed_target(finder: &dyn TestFileFinder, path: &Path, is_test: bool) -> PathBuf {
    if is_test {
        return package_of(path);
    }
    match finder.find_test_file(path) {
        Ok(test_file) => package_of(&test_file),
        Err(_) => package_of(path),
    }
}

fn related_targets(finder: &dyn TestFileFinder, path: &Path, is_test: bool) -> Vec<PathBuf> {
    if is_test {
        let mut targets = vec![package_of(path)];
        if let Ok(impl_file) = finder.find_implementation_file(path) {
            targets.push(package_of(&impl_file));
        }
        return targets;
    }

    match finder.find_package_tests(path) {
        Ok(tests) if !tests.is_empty() => tests.iter().map(|t| package_of(t)).collect(),
        _ => vec![package_of(path)],
    }
}

/// Drop repeated targets, keeping first-seen order.
pub fn dedup_targets(targets: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|t| seen.insert(normalized_str(t)))
        .collect()
}

/// Render a package directory as a runner argument.
///
/// Relative packages get a `./` prefix so `go test`-style tools treat them
/// as paths rather than import paths.
pub fn target_arg(package: &Path) -> String {
    let s = normalized_str(package);
    if s.is_empty() || s == "." {
        ".".to_string()
    } else if package.is_absolute() || s.starts_with("../") {
        s
    } else {
        format!("./{s}")
    }
}
