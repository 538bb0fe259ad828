// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::watch::path_utils::normalized_str;

/// Compiled set of glob patterns (ignore list or test-file patterns).
///
/// A path matches when any pattern matches either the normalized path
/// (forward slashes, no leading `./`) or its bare file name, so both
/// `"**/vendor/**"` and `"*_test.go"` behave as users expect.
#[derive(Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: patterns.to_vec(),
            set: build_globset(patterns)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_match(&self, path: &Path) -> bool {
        if self.is_empty() {
            return false;
        }
        let normalized = normalized_str(path);
        if self.set.is_match(&normalized) {
            return true;
        }
        match path.file_name() {
            Some(name) => self.set.is_match(name.to_string_lossy().as_ref()),
            None => false,
        }
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
