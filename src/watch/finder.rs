// src/watch/finder.rs

//! Mapping between implementation files and their test files.
//!
//! The selector only talks to the [`TestFileFinder`] trait. The default
//! [`ConventionFinder`] pairs `dir/name.ext` with `dir/name_test.ext` and
//! recognises test files through the configured test patterns.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};

use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::path_utils::package_of;
use crate::watch::patterns::PatternSet;

const TEST_SUFFIX: &str = "_test";

/// Test-file discovery collaborator.
pub trait TestFileFinder: Send + Sync + fmt::Debug {
    fn is_test_file(&self, path: &Path) -> bool;

    /// Test file exercising `impl_path`. A test file maps to itself.
    fn find_test_file(&self, impl_path: &Path) -> Result<PathBuf>;

    /// Implementation file covered by `test_path`.
    fn find_implementation_file(&self, test_path: &Path) -> Result<PathBuf>;

    /// All test files in the package (directory) of `path`. An empty result
    /// is reported as an error.
    fn find_package_tests(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Naming-convention finder over a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct ConventionFinder {
    fs: Arc<dyn FileSystem>,
    test_patterns: PatternSet,
}

impl ConventionFinder {
    pub fn new(fs: Arc<dyn FileSystem>, test_patterns: &[String]) -> Result<Self> {
        Ok(Self {
            fs,
            test_patterns: PatternSet::new(test_patterns)?,
        })
    }

    /// Finder over the real filesystem.
    pub fn on_disk(test_patterns: &[String]) -> Result<Self> {
        Self::new(Arc::new(RealFileSystem), test_patterns)
    }

    fn existing_file(&self, candidate: PathBuf) -> Option<PathBuf> {
        self.fs.is_file(&candidate).then_some(candidate)
    }
}

/// Split `name.ext` into (`name`, `Some("ext")`).
fn split_name(path: &Path) -> Option<(String, Option<String>)> {
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    Some((stem, ext))
}

fn with_name(path: &Path, stem: &str, ext: Option<&str>) -> PathBuf {
    let file_name = match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    };
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

impl TestFileFinder for ConventionFinder {
    fn is_test_file(&self, path: &Path) -> bool {
        self.test_patterns.is_match(path)
    }

    fn find_test_file(&self, impl_path: &Path) -> Result<PathBuf> {
        if impl_path.as_os_str().is_empty() {
            bail!("file path cannot be empty");
        }
        if self.is_test_file(impl_path) {
            return Ok(impl_path.to_path_buf());
        }

        let (stem, ext) =
            split_name(impl_path).ok_or_else(|| anyhow!("no file name in {:?}", impl_path))?;
        let candidate = with_name(impl_path, &format!("{stem}{TEST_SUFFIX}"), ext.as_deref());

        self.existing_file(candidate)
            .ok_or_else(|| anyhow!("test file not found for {:?}", impl_path))
    }

    fn find_implementation_file(&self, test_path: &Path) -> Result<PathBuf> {
        if test_path.as_os_str().is_empty() {
            bail!("test path cannot be empty");
        }
        if !self.is_test_file(test_path) {
            bail!("not a test file: {:?}", test_path);
        }

        let (stem, ext) =
            split_name(test_path).ok_or_else(|| anyhow!("no file name in {:?}", test_path))?;
        let impl_stem = stem
            .strip_suffix(TEST_SUFFIX)
            .ok_or_else(|| anyhow!("cannot derive implementation name from {:?}", test_path))?;
        let candidate = with_name(test_path, impl_stem, ext.as_deref());

        self.existing_file(candidate)
            .ok_or_else(|| anyhow!("implementation file not found for {:?}", test_path))
    }

    fn find_package_tests(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if path.as_os_str().is_empty() {
            bail!("file path cannot be empty");
        }

        let dir = package_of(path);
        let tests: Vec<PathBuf> = self
            .fs
            .read_dir(&dir)?
            .into_iter()
            .filter(|p| self.fs.is_file(p) && self.is_test_file(p))
            .collect();

        if tests.is_empty() {
            bail!("no test files found in {:?}", dir);
        }
        Ok(tests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn finder(files: &[&str]) -> ConventionFinder {
        let fs = MockFileSystem::with_files(files.iter().copied());
        ConventionFinder::new(Arc::new(fs), &["*_test.go".to_string()]).unwrap()
    }

    #[test]
    fn finds_test_file_next_to_implementation() {
        let f = finder(&["pkg/a.go", "pkg/a_test.go"]);
        assert_eq!(
            f.find_test_file(Path::new("pkg/a.go")).unwrap(),
            PathBuf::from("pkg/a_test.go")
        );
    }

    #[test]
    fn test_file_maps_to_itself() {
        let f = finder(&["pkg/a_test.go"]);
        assert_eq!(
            f.find_test_file(Path::new("pkg/a_test.go")).unwrap(),
            PathBuf::from("pkg/a_test.go")
        );
    }

    #[test]
    fn missing_test_file_is_an_error() {
        let f = finder(&["pkg/a.go"]);
        assert!(f.find_test_file(Path::new("pkg/a.go")).is_err());
    }

    #[test]
    fn finds_implementation_for_test_file() {
        let f = finder(&["a.go", "a_test.go"]);
        assert_eq!(
            f.find_implementation_file(Path::new("a_test.go")).unwrap(),
            PathBuf::from("a.go")
        );
        assert!(f.find_implementation_file(Path::new("a.go")).is_err());
    }

    #[test]
    fn package_tests_only_include_test_files() {
        let f = finder(&["pkg/a.go", "pkg/a_test.go", "pkg/b_test.go", "other/c_test.go"]);
        let tests = f.find_package_tests(Path::new("pkg/a.go")).unwrap();
        assert_eq!(
            tests,
            vec![PathBuf::from("pkg/a_test.go"), PathBuf::from("pkg/b_test.go")]
        );
    }

    #[test]
    fn package_without_tests_is_an_error() {
        let f = finder(&["pkg/a.go"]);
        assert!(f.find_package_tests(Path::new("pkg/a.go")).is_err());
    }
}
