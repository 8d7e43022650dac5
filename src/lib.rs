// src/lib.rs

pub mod cli;
pub mod db;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod import;
pub mod logging;
pub mod spool;
pub mod triage;
pub mod types;
pub mod watch;

use std::sync::Arc;

use tokio::sync::watch as watch_channel;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::db::{ConnectionGuard, PgDatabase};
use crate::engine::{Controller, EventLoop, RuntimeOptions};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::import::DatabaseImporter;
use crate::spool::SpoolLayout;
use crate::watch::{ChangeSource, NotificationWatch, PollScan};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - spool directory provisioning (fatal if it fails)
/// - the database connection and its guard
/// - the record importer
/// - change-source selection (notification with polling fallback)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let layout = SpoolLayout::new(&args.spool_dir);

    // Startup provisioning; any failure here terminates the process.
    layout.migrate_legacy_bucket(fs.as_ref())?;
    layout.ensure(fs.as_ref())?;

    let db = PgDatabase::new(&args.database_url)?;
    let importer = DatabaseImporter::new(db.pool().clone(), layout.clone(), Arc::clone(&fs));
    let guard = ConnectionGuard::new(db);

    // Ctrl-C → graceful shutdown: the loop finishes the current file or
    // drain pass, then exits with success status.
    let (shutdown_tx, shutdown_rx) = watch_channel::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            eprintln!("cdrwatch: failed to listen for Ctrl+C: {err}");
            return;
        }
        let _ = shutdown_tx.send(true);
    });

    let source = select_source(&args, &layout);
    info!(mode = %source.mode(), spool = ?layout.root(), "watch mode selected");

    let controller = Controller::new(source.mode());
    let options = RuntimeOptions {
        drain_once: args.once,
    };

    let event_loop = EventLoop::new(
        layout,
        fs,
        guard,
        importer,
        controller,
        source,
        shutdown_rx,
        options,
    );
    event_loop.run().await
}

/// Attempt a notification subscription; fall back to polling when the
/// facility is unavailable or `--poll` was given.
fn select_source(args: &CliArgs, layout: &SpoolLayout) -> ChangeSource {
    if args.poll {
        return ChangeSource::Poll(PollScan::new(layout.root()));
    }
    match NotificationWatch::subscribe(layout.root()) {
        Ok(subscription) => ChangeSource::Notification(subscription),
        Err(err) => {
            warn!(error = %err, "change notification unavailable; falling back to polling");
            ChangeSource::Poll(PollScan::new(layout.root()))
        }
    }
}
