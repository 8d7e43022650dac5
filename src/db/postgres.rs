// src/db/postgres.rs

//! Postgres-backed [`Database`] implementation.
//!
//! The sqlx pool already re-establishes physical connections lazily, so
//! "reconnect" here means forcing an acquisition and re-priming the cached
//! settings. Repeated reconnects cost nothing beyond the probe itself.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use crate::errors::Result;

use super::Database;

pub struct PgDatabase {
    pool: PgPool,
    settings: HashMap<String, String>,
}

impl PgDatabase {
    /// Build a lazily-connecting pool for `url`. No I/O happens here; the
    /// first liveness probe establishes the physical connection.
    pub fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_lazy(url)?;
        Ok(Self {
            pool,
            settings: HashMap::new(),
        })
    }

    /// Shared handle to the underlying pool (cheap clone).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cached value of a settings row, if loaded.
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }
}

impl Database for PgDatabase {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            // Force a physical connection out of the lazy pool.
            let conn = self.pool.acquire().await?;
            drop(conn);
            Ok(())
        })
    }

    fn is_connected(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .is_ok()
        })
    }

    fn refresh_settings(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let rows: Vec<(String, String)> =
                sqlx::query_as("SELECT name, value FROM settings")
                    .fetch_all(&self.pool)
                    .await?;
            self.settings = rows.into_iter().collect();
            debug!(count = self.settings.len(), "settings cache refreshed");
            Ok(())
        })
    }
}
