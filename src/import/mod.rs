// src/import/mod.rs

//! Record importer seam.
//!
//! The watch/dispatch loop hands every accepted payload to a
//! [`RecordImporter`]. The importer owns the parse/persistence outcome,
//! including routing its own failures into the `failed/xml` and
//! `failed/sql` buckets. Tests substitute a recording importer from
//! `cdrwatch-test-utils`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::spool::SpoolLayout;
use crate::types::Leg;

/// Trait abstracting the downstream record importer.
///
/// The loop calls `import` with the leg designation, the decoded payload and
/// the original basename (for traceability). Implementations are free to
/// parse, persist, and move the spool file wherever their outcome dictates.
pub trait RecordImporter: Send {
    fn import(
        &mut self,
        leg: Leg,
        payload: String,
        basename: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Importer that stores raw payloads in the `cdr_import_queue` table.
///
/// - On success the spool file is removed.
/// - On a storage error the spool file is moved to `failed/sql` under its
///   original basename; the error is absorbed (logged) so one bad insert
///   never stalls the loop.
pub struct DatabaseImporter {
    pool: PgPool,
    layout: SpoolLayout,
    fs: Arc<dyn FileSystem>,
}

impl DatabaseImporter {
    pub fn new(pool: PgPool, layout: SpoolLayout, fs: Arc<dyn FileSystem>) -> Self {
        Self { pool, layout, fs }
    }

    async fn store(&self, leg: Leg, payload: &str, basename: &str) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO cdr_import_queue (leg, basename, payload) VALUES ($1, $2, $3)",
        )
        .bind(leg.as_str())
        .bind(basename)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl RecordImporter for DatabaseImporter {
    fn import(
        &mut self,
        leg: Leg,
        payload: String,
        basename: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let (_, path) = self.layout.resolve(&basename);
            match self.store(leg, &payload, &basename).await {
                Ok(()) => {
                    debug!(file = %basename, leg = %leg, "record queued for import");
                    if let Err(err) = self.fs.remove_file(&path) {
                        warn!(file = %basename, error = %err, "failed to remove imported spool file");
                    }
                }
                Err(err) => {
                    warn!(file = %basename, error = %err, "storing record failed; moving to sql bucket");
                    let dest = self.layout.sql_bucket().join(&basename);
                    if let Err(err) = self.fs.rename(&path, &dest) {
                        warn!(file = %basename, error = %err, "failed to move file to sql bucket");
                    }
                }
            }
            Ok(())
        })
    }
}
