// src/spool/mod.rs

//! Spool directory layout.
//!
//! The daemon watches one landing directory. Files rejected by triage or by
//! the importer land in dedicated failure buckets underneath it:
//!
//! ```text
//! <root>/failed/size   zero-byte or oversized files
//! <root>/failed/xml    malformed XML (routed by the importer)
//! <root>/failed/sql    storage failures (routed by the importer)
//! ```
//!
//! Older deployments used `failed/invalid_xml` for the xml bucket; it is
//! renamed once at startup if found.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::fs::FileSystem;

const FAILED_DIR: &str = "failed";
const SIZE_BUCKET: &str = "size";
const XML_BUCKET: &str = "xml";
const SQL_BUCKET: &str = "sql";
const LEGACY_XML_BUCKET: &str = "invalid_xml";

/// Paths of the watched directory and its failure buckets.
#[derive(Debug, Clone)]
pub struct SpoolLayout {
    root: PathBuf,
}

impl SpoolLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn size_bucket(&self) -> PathBuf {
        self.root.join(FAILED_DIR).join(SIZE_BUCKET)
    }

    pub fn xml_bucket(&self) -> PathBuf {
        self.root.join(FAILED_DIR).join(XML_BUCKET)
    }

    pub fn sql_bucket(&self) -> PathBuf {
        self.root.join(FAILED_DIR).join(SQL_BUCKET)
    }

    fn legacy_xml_bucket(&self) -> PathBuf {
        self.root.join(FAILED_DIR).join(LEGACY_XML_BUCKET)
    }

    /// Resolve a candidate name (possibly directory-relative) to its
    /// basename and absolute path inside the spool.
    pub fn resolve(&self, name: &str) -> (String, PathBuf) {
        let basename = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let path = self.root.join(&basename);
        (basename, path)
    }

    /// Create any missing failure buckets (parents included, mode 0o770).
    ///
    /// Idempotent; a second run is a no-op. A creation failure is a fatal
    /// startup error for the daemon.
    pub fn ensure(&self, fs: &dyn FileSystem) -> Result<()> {
        for bucket in [self.size_bucket(), self.xml_bucket(), self.sql_bucket()] {
            if !fs.is_dir(&bucket) {
                fs.create_private_dir(&bucket)
                    .with_context(|| format!("provisioning failure bucket {:?}", bucket))?;
            }
        }
        Ok(())
    }

    /// Rename `failed/invalid_xml` to `failed/xml` if the old bucket exists
    /// and the new one does not. No-op otherwise. Runs before [`ensure`].
    ///
    /// [`ensure`]: SpoolLayout::ensure
    pub fn migrate_legacy_bucket(&self, fs: &dyn FileSystem) -> Result<()> {
        let legacy = self.legacy_xml_bucket();
        let current = self.xml_bucket();
        if fs.is_dir(&legacy) && !fs.exists(&current) {
            fs.rename(&legacy, &current)
                .with_context(|| format!("migrating legacy bucket {:?}", legacy))?;
            info!(from = ?legacy, to = ?current, "migrated legacy failure bucket");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn layout() -> SpoolLayout {
        SpoolLayout::new("/spool/cdr")
    }

    #[test]
    fn ensure_creates_all_buckets() {
        let fs = MockFileSystem::new();
        fs.add_dir("/spool/cdr");
        let layout = layout();

        layout.ensure(&fs).unwrap();

        assert!(fs.is_dir(&layout.size_bucket()));
        assert!(fs.is_dir(&layout.xml_bucket()));
        assert!(fs.is_dir(&layout.sql_bucket()));
    }

    #[test]
    fn ensure_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_dir("/spool/cdr");
        let layout = layout();

        layout.ensure(&fs).unwrap();
        layout.ensure(&fs).unwrap();
    }

    #[test]
    fn legacy_bucket_is_renamed_once() {
        let fs = MockFileSystem::new();
        fs.add_dir("/spool/cdr/failed/invalid_xml");
        let layout = layout();

        layout.migrate_legacy_bucket(&fs).unwrap();

        assert!(fs.is_dir(&layout.xml_bucket()));
        assert!(!fs.is_dir("/spool/cdr/failed/invalid_xml".as_ref()));
    }

    #[test]
    fn migration_without_legacy_bucket_is_a_noop() {
        let fs = MockFileSystem::new();
        fs.add_dir("/spool/cdr");
        let layout = layout();

        layout.migrate_legacy_bucket(&fs).unwrap();

        assert!(!fs.exists(&layout.xml_bucket()));
    }

    #[test]
    fn migration_leaves_existing_current_bucket_alone() {
        let fs = MockFileSystem::new();
        fs.add_dir("/spool/cdr/failed/invalid_xml");
        fs.add_dir("/spool/cdr/failed/xml");
        let layout = layout();

        layout.migrate_legacy_bucket(&fs).unwrap();

        // Both still present; nothing was renamed over the current bucket.
        assert!(fs.is_dir("/spool/cdr/failed/invalid_xml".as_ref()));
        assert!(fs.is_dir(&layout.xml_bucket()));
    }

    #[test]
    fn resolve_strips_directory_components() {
        let layout = layout();
        let (basename, path) = layout.resolve("sub/a_123.cdr.xml");
        assert_eq!(basename, "a_123.cdr.xml");
        assert_eq!(path, PathBuf::from("/spool/cdr/a_123.cdr.xml"));
    }
}
