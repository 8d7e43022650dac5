// src/watch/poll.rs

//! Polling fallback: one directory listing per call.

use std::path::PathBuf;

use tracing::warn;

use super::Signal;
use crate::fs::FileSystem;

/// Lists the spool directory on demand. Rate limiting (the 100 ms sleep
/// between passes) belongs to the caller, not this type.
#[derive(Debug, Clone)]
pub struct PollScan {
    root: PathBuf,
}

impl PollScan {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List the directory once; subdirectories (the failure buckets) are
    /// filtered out by the filesystem layer.
    pub fn scan(&self, fs: &dyn FileSystem) -> Signal {
        match fs.list_files(&self.root) {
            Ok(names) => Signal::Names(names),
            Err(err) => {
                warn!(error = %err, "failed to list spool directory");
                Signal::Names(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn scan_returns_files_but_not_subdirectories() {
        let fs = MockFileSystem::new();
        fs.add_dir("/spool/cdr/failed/size");
        fs.add_file("/spool/cdr/a_1.cdr.xml", "x");
        fs.add_file("/spool/cdr/junk.txt", "y");

        let scan = PollScan::new("/spool/cdr");
        match scan.scan(&fs) {
            Signal::Names(names) => {
                assert_eq!(names, vec!["a_1.cdr.xml", "junk.txt"]);
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn unreadable_directory_yields_an_empty_listing() {
        let fs = MockFileSystem::new();
        let scan = PollScan::new("/missing");
        assert_eq!(scan.scan(&fs), Signal::Names(Vec::new()));
    }
}
