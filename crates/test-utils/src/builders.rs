#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use cdrwatch::spool::SpoolLayout;
use tempfile::TempDir;

/// Builder for a temporary spool directory populated with files.
///
/// Keeps the `TempDir` guard alive alongside the layout so the directory
/// survives for the duration of the test.
pub struct SpoolDirBuilder {
    dir: TempDir,
    provision: bool,
}

impl SpoolDirBuilder {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("creating temp spool dir"),
            provision: true,
        }
    }

    /// Leave the failure buckets uncreated (for provisioning tests).
    pub fn without_buckets(mut self) -> Self {
        self.provision = false;
        self
    }

    /// Place a file with the given name and content in the spool root.
    pub fn with_file(self, name: &str, content: impl AsRef<[u8]>) -> Self {
        fs::write(self.dir.path().join(name), content).expect("writing spool file");
        self
    }

    /// Place a file of `len` zero bytes in the spool root.
    pub fn with_file_of_len(self, name: &str, len: usize) -> Self {
        fs::write(self.dir.path().join(name), vec![0u8; len]).expect("writing spool file");
        self
    }

    pub fn build(self) -> (TempDir, SpoolLayout) {
        let layout = SpoolLayout::new(self.dir.path());
        if self.provision {
            let fs_impl = cdrwatch::fs::RealFileSystem;
            layout
                .ensure(&fs_impl)
                .expect("provisioning failure buckets");
        }
        (self.dir, layout)
    }
}

impl Default for SpoolDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Path of `name` inside the spool root.
pub fn spool_path(layout: &SpoolLayout, name: &str) -> PathBuf {
    layout.root().join(name)
}

/// True if `name` sits in the given failure bucket.
pub fn in_bucket(bucket: &Path, name: &str) -> bool {
    bucket.join(name).exists()
}
