// src/db/mod.rs

//! Database liveness gating.
//!
//! The loop never triages files while the record store is unreachable.
//! [`ConnectionGuard`] blocks each iteration until [`Database::is_connected`]
//! reports true, retrying on a fixed 3-second interval with no backoff and
//! no attempt cap. Disconnection is a transient condition; the daemon is
//! expected to outlive it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::Result;

pub mod postgres;

pub use postgres::PgDatabase;

/// Fixed wait between reconnect attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// Trait abstracting the persistence connection.
///
/// Production code uses [`PgDatabase`]; tests provide a fake that scripts
/// connectivity. Reconnecting must be safe to call repeatedly without
/// leaking resources.
pub trait Database: Send {
    /// (Re)establish connectivity.
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Whether the store currently answers.
    fn is_connected(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    /// Reload connection-dependent cached configuration. Called after every
    /// successful reconnect, since the settings may have been unreachable.
    fn refresh_settings(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Gates the event loop on database liveness.
pub struct ConnectionGuard<D: Database> {
    db: D,
    retry_interval: Duration,
}

impl<D: Database> ConnectionGuard<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            retry_interval: RECONNECT_INTERVAL,
        }
    }

    #[cfg(test)]
    pub fn with_retry_interval(db: D, retry_interval: Duration) -> Self {
        Self { db, retry_interval }
    }

    /// Block until the database is connected.
    ///
    /// Returns `false` only when shutdown was requested while waiting.
    pub async fn ensure_connected(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            if self.db.is_connected().await {
                return true;
            }

            warn!("database unavailable; attempting to reconnect");
            match self.db.connect().await {
                Ok(()) => {
                    if let Err(err) = self.db.refresh_settings().await {
                        warn!(error = %err, "failed to refresh settings after reconnect");
                    }
                    // Re-check right away; a successful connect usually
                    // means the next liveness probe passes.
                    continue;
                }
                Err(err) => {
                    debug!(error = %err, "reconnect attempt failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.retry_interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fake database that fails the first `failures` connect attempts.
    struct FlakyDatabase {
        failures: usize,
        attempts: Arc<AtomicUsize>,
        refreshes: Arc<AtomicUsize>,
        connected: bool,
    }

    impl Database for FlakyDatabase {
        fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < self.failures {
                    Err(anyhow::anyhow!("connection refused").into())
                } else {
                    self.connected = true;
                    Ok(())
                }
            })
        }

        fn is_connected(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
            let connected = self.connected;
            Box::pin(async move { connected })
        }

        fn refresh_settings(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn guard_retries_on_fixed_interval_until_connected() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let refreshes = Arc::new(AtomicUsize::new(0));
        let db = FlakyDatabase {
            failures: 3,
            attempts: Arc::clone(&attempts),
            refreshes: Arc::clone(&refreshes),
            connected: false,
        };
        let mut guard = ConnectionGuard::new(db);
        let (_tx, mut rx) = watch::channel(false);

        let start = tokio::time::Instant::now();
        assert!(guard.ensure_connected(&mut rx).await);

        // Three failed attempts, each followed by the fixed wait, then the
        // fourth attempt succeeds and is re-checked without sleeping.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), RECONNECT_INTERVAL * 3);
    }

    #[tokio::test]
    async fn guard_returns_immediately_when_connected() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let db = FlakyDatabase {
            failures: 0,
            attempts: Arc::clone(&attempts),
            refreshes: Arc::new(AtomicUsize::new(0)),
            connected: true,
        };
        let mut guard = ConnectionGuard::new(db);
        let (_tx, mut rx) = watch::channel(false);

        assert!(guard.ensure_connected(&mut rx).await);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn guard_aborts_on_shutdown() {
        let db = FlakyDatabase {
            failures: usize::MAX,
            attempts: Arc::new(AtomicUsize::new(0)),
            refreshes: Arc::new(AtomicUsize::new(0)),
            connected: false,
        };
        let mut guard = ConnectionGuard::new(db);
        let (tx, mut rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            let _ = tx.send(true);
        });

        assert!(!guard.ensure_connected(&mut rx).await);
    }
}
