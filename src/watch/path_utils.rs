// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher and selector.

use std::path::{Path, PathBuf};

/// Forward-slash form of `path` without a leading `./`.
pub fn normalized_str(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    match s.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

/// The package (directory) a file belongs to.
///
/// Bare file names belong to `"."`.
pub fn package_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
