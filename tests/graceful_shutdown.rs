// tests/graceful_shutdown.rs

//! Cancellation is cooperative: the loop checks the shutdown flag once per
//! iteration and exits cleanly after the current pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use cdrwatch::db::ConnectionGuard;
use cdrwatch::engine::{Controller, EventLoop, RuntimeOptions};
use cdrwatch::fs::{FileSystem, RealFileSystem};
use cdrwatch::types::WatchMode;
use cdrwatch::watch::{ChangeSource, PollScan};

use cdrwatch_test_utils::builders::SpoolDirBuilder;
use cdrwatch_test_utils::fakes::{FakeDatabase, RecordingImporter};
use cdrwatch_test_utils::{init_tracing, with_timeout};

#[tokio::test]
async fn polling_loop_stops_on_shutdown_signal() {
    init_tracing();

    let (_dir, layout) = SpoolDirBuilder::new().build();
    let (db, _handle) = FakeDatabase::new(true);
    let (importer, _records) = RecordingImporter::new(layout.root());

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let event_loop = EventLoop::new(
        layout.clone(),
        fs,
        ConnectionGuard::new(db),
        importer,
        Controller::new(WatchMode::Poll),
        ChangeSource::Poll(PollScan::new(layout.root())),
        shutdown_rx,
        RuntimeOptions::default(),
    );

    let handle = tokio::spawn(event_loop.run());

    // Let it spin a few polling passes, then stop it.
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown_tx.send(true).unwrap();

    let result = with_timeout(handle).await.unwrap();
    assert!(result.is_ok(), "loop must exit cleanly: {result:?}");
}

#[tokio::test]
async fn shutdown_during_disconnect_unblocks_the_gate() {
    init_tracing();

    let (_dir, layout) = SpoolDirBuilder::new()
        .with_file("a_1.cdr.xml", "<cdr/>")
        .build();
    let (db, _handle) = FakeDatabase::new(false);
    let (importer, records) = RecordingImporter::new(layout.root());

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let event_loop = EventLoop::new(
        layout.clone(),
        fs,
        ConnectionGuard::new(db),
        importer,
        Controller::new(WatchMode::Poll),
        ChangeSource::Poll(PollScan::new(layout.root())),
        shutdown_rx,
        RuntimeOptions::default(),
    );

    let handle = tokio::spawn(event_loop.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(true).unwrap();

    let result = with_timeout(handle).await.unwrap();
    assert!(result.is_ok());
    // Nothing was triaged while the store was down.
    assert!(records.lock().unwrap().is_empty());
    assert!(layout.root().join("a_1.cdr.xml").exists());
}
