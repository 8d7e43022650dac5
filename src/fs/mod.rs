// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// Mode for the failure-bucket directories: owner+group rwx, no world access.
pub const BUCKET_DIR_MODE: u32 = 0o770;

/// Abstract filesystem interface.
///
/// Everything the daemon does to the spool directory goes through this trait
/// so that triage and layout logic can be unit tested against
/// [`mock::MockFileSystem`] without touching a real directory.
pub trait FileSystem: Send + Sync + Debug {
    /// Read the full contents of a file.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Size of a file in bytes.
    fn file_len(&self, path: &Path) -> Result<u64>;

    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Rename `from` to `to`, replacing `to` if it already exists.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Create a directory (and missing parents) with [`BUCKET_DIR_MODE`].
    /// A no-op if the directory already exists.
    fn create_private_dir(&self, path: &Path) -> Result<()>;

    /// Names of the non-directory entries of `dir`.
    fn list_files(&self, dir: &Path) -> Result<Vec<String>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        let meta =
            fs::metadata(path).with_context(|| format!("reading metadata of {:?}", path))?;
        Ok(meta.len())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).with_context(|| format!("moving {:?} to {:?}", from, to))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
    }

    #[cfg(unix)]
    fn create_private_dir(&self, path: &Path) -> Result<()> {
        use std::os::unix::fs::DirBuilderExt;

        if path.is_dir() {
            return Ok(());
        }
        fs::DirBuilder::new()
            .recursive(true)
            .mode(BUCKET_DIR_MODE)
            .create(path)
            .with_context(|| format!("creating directory {:?}", path))
    }

    #[cfg(not(unix))]
    fn create_private_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating directory {:?}", path))
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
