use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cdrwatch::db::Database;
use cdrwatch::errors::Result;
use cdrwatch::import::RecordImporter;
use cdrwatch::types::Leg;

/// Scriptable database: tests flip connectivity through the shared handle.
pub struct FakeDatabase {
    connected: Arc<AtomicBool>,
    connect_attempts: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
    /// Whether `connect()` succeeds while the handle says "down".
    connect_heals: bool,
}

/// Shared view over a [`FakeDatabase`]'s state.
#[derive(Clone)]
pub struct FakeDatabaseHandle {
    connected: Arc<AtomicBool>,
    connect_attempts: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
}

impl FakeDatabase {
    /// A database that starts in the given state; `connect()` only succeeds
    /// once the handle has been flipped to connected.
    pub fn new(initially_connected: bool) -> (Self, FakeDatabaseHandle) {
        let connected = Arc::new(AtomicBool::new(initially_connected));
        let connect_attempts = Arc::new(AtomicUsize::new(0));
        let refreshes = Arc::new(AtomicUsize::new(0));
        let handle = FakeDatabaseHandle {
            connected: Arc::clone(&connected),
            connect_attempts: Arc::clone(&connect_attempts),
            refreshes: Arc::clone(&refreshes),
        };
        (
            Self {
                connected,
                connect_attempts,
                refreshes,
                connect_heals: false,
            },
            handle,
        )
    }

    /// A database whose `connect()` always succeeds (reconnecting heals it).
    pub fn healing(initially_connected: bool) -> (Self, FakeDatabaseHandle) {
        let (mut db, handle) = Self::new(initially_connected);
        db.connect_heals = true;
        (db, handle)
    }
}

impl FakeDatabaseHandle {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl Database for FakeDatabase {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let heals = self.connect_heals;
        let connected = Arc::clone(&self.connected);
        Box::pin(async move {
            if heals {
                connected.store(true, Ordering::SeqCst);
            }
            if connected.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(anyhow::anyhow!("connection refused").into())
            }
        })
    }

    fn is_connected(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let connected = self.connected.load(Ordering::SeqCst);
        Box::pin(async move { connected })
    }

    fn refresh_settings(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// One captured importer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRecord {
    pub leg: Leg,
    pub payload: String,
    pub basename: String,
}

/// Importer that records every call and, like the production importer,
/// removes the spool file after a successful import so drains terminate.
pub struct RecordingImporter {
    spool_root: std::path::PathBuf,
    records: Arc<Mutex<Vec<ImportedRecord>>>,
}

impl RecordingImporter {
    pub fn new(spool_root: impl Into<std::path::PathBuf>) -> (Self, Arc<Mutex<Vec<ImportedRecord>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                spool_root: spool_root.into(),
                records: Arc::clone(&records),
            },
            records,
        )
    }
}

impl RecordImporter for RecordingImporter {
    fn import(
        &mut self,
        leg: Leg,
        payload: String,
        basename: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let path = self.spool_root.join(&basename);
        self.records.lock().unwrap().push(ImportedRecord {
            leg,
            payload,
            basename,
        });
        Box::pin(async move {
            let _ = std::fs::remove_file(path);
            Ok(())
        })
    }
}
