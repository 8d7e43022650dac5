// src/fs/mock.rs

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use super::FileSystem;

/// In-memory filesystem for unit tests.
///
/// Holds files as path → bytes and directories as a set of paths. Good
/// enough for the operations the daemon performs; no permissions, no
/// symlinks, no partial reads.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.inner.lock().unwrap();
        add_dir_with_parents(&mut state.dirs, path.as_ref());
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.inner.lock().unwrap();
        if let Some(parent) = path.parent() {
            add_dir_with_parents(&mut state.dirs, parent);
        }
        state.files.insert(path, content.into());
    }

    /// Current content of a file, if present.
    pub fn file_content(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().files.get(path.as_ref()).cloned()
    }
}

fn add_dir_with_parents(dirs: &mut HashSet<PathBuf>, path: &Path) {
    let mut current = PathBuf::new();
    for part in path.components() {
        current.push(part);
        dirs.insert(current.clone());
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {:?}", path))
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| anyhow!("no such file: {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.inner.lock().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().dirs.contains(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if let Some(content) = state.files.remove(from) {
            state.files.insert(to.to_path_buf(), content);
            return Ok(());
        }
        if state.dirs.remove(from) {
            state.dirs.insert(to.to_path_buf());
            return Ok(());
        }
        Err(anyhow!("no such entry: {:?}", from))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow!("no such file: {:?}", path))
    }

    fn create_private_dir(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        if !state.dirs.contains(dir) {
            return Err(anyhow!("no such directory: {:?}", dir));
        }
        let mut names: Vec<String> = state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}
