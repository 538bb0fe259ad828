// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::lock_unpoisoned;

#[derive(Debug, Clone)]
enum MockEntry {
    File,
    Dir(BTreeSet<String>),
}

/// In-memory tree of files and directories.
///
/// Paths are stored exactly as given (no canonicalization); parent
/// directories are created implicitly when a file is added. Bare file
/// names live under `"."`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir(BTreeSet::new()));
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Convenience constructor: a tree containing `files`.
    pub fn with_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let fs = Self::new();
        for f in files {
            fs.add_file(f);
        }
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = lock_unpoisoned(&self.entries);
        entries.insert(path.clone(), MockEntry::File);
        link_to_parent(&mut entries, &path);
    }

    /// Remove a file (its parent directory stays).
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = lock_unpoisoned(&self.entries);
        entries.remove(path);
        if let (Some(parent), Some(name)) = (parent_of(path), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = entries.get_mut(&parent) {
                children.remove(&name.to_string_lossy().into_owned());
            }
        }
    }
}

fn parent_of(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(PathBuf::from("."))
    } else if parent == path {
        None
    } else {
        Some(parent.to_path_buf())
    }
}

fn link_to_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    if parent == path {
        return;
    }

    if !entries.contains_key(&parent) {
        entries.insert(parent.clone(), MockEntry::Dir(BTreeSet::new()));
        link_to_parent(entries, &parent);
    }

    if let (Some(MockEntry::Dir(children)), Some(name)) =
        (entries.get_mut(&parent), path.file_name())
    {
        children.insert(name.to_string_lossy().into_owned());
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        lock_unpoisoned(&self.entries).contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(lock_unpoisoned(&self.entries).get(path), Some(MockEntry::File))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(lock_unpoisoned(&self.entries).get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = lock_unpoisoned(&self.entries);
        match entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                let base = if path == Path::new(".") {
                    PathBuf::new()
                } else {
                    path.to_path_buf()
                };
                Ok(children.iter().map(|name| base.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
