// src/engine/runtime.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::db::{ConnectionGuard, Database};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::import::RecordImporter;
use crate::spool::SpoolLayout;
use crate::triage;
use crate::watch::{ChangeSource, PollScan};

use super::core::{Action, Controller};
use super::{POLL_SLEEP, RuntimeOptions};

/// Drives triage in response to change-source signals.
///
/// This is the IO shell around [`Controller`], which contains the mode and
/// re-scan semantics. The shell handles the blocking points: the connection
/// gate, the signal wait, sleeps, and per-file processing. All per-file and
/// per-cycle errors are absorbed here as log signals; nothing aborts the
/// loop.
pub struct EventLoop<D: Database, I: RecordImporter> {
    layout: SpoolLayout,
    fs: Arc<dyn FileSystem>,
    guard: ConnectionGuard<D>,
    importer: I,
    controller: Controller,
    source: ChangeSource,
    shutdown: watch::Receiver<bool>,
    options: RuntimeOptions,
}

impl<D: Database, I: RecordImporter> fmt::Debug for EventLoop<D, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("layout", &self.layout)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl<D: Database, I: RecordImporter> EventLoop<D, I> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        layout: SpoolLayout,
        fs: Arc<dyn FileSystem>,
        guard: ConnectionGuard<D>,
        importer: I,
        controller: Controller,
        source: ChangeSource,
        shutdown: watch::Receiver<bool>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            layout,
            fs,
            guard,
            importer,
            controller,
            source,
            shutdown,
            options,
        }
    }

    /// Main loop. Returns when shutdown is requested (or, in `--once` mode,
    /// after a single drain).
    pub async fn run(mut self) -> Result<()> {
        info!(mode = %self.controller.mode(), "cdrwatch event loop started");

        if self.options.drain_once {
            if self.guard.ensure_connected(&mut self.shutdown).await {
                self.drain_spool().await;
            }
            return Ok(());
        }

        // Catch-up pass for files that arrived while the daemon was down.
        if !self.guard.ensure_connected(&mut self.shutdown).await {
            return Ok(());
        }
        let startup = self.controller.startup(Instant::now());
        for action in startup.actions {
            self.execute(action).await;
        }

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            if !self.guard.ensure_connected(&mut self.shutdown).await {
                break;
            }

            let signal = tokio::select! {
                _ = self.shutdown.changed() => break,
                signal = self.source.wait_for_signal(&self.fs) => signal,
            };

            let step = self.controller.on_signal(signal, Instant::now());
            for action in step.actions {
                self.execute(action).await;
            }
        }

        info!("event loop exiting");
        Ok(())
    }

    async fn execute(&mut self, action: Action) {
        match action {
            Action::ProcessFiles(names) => {
                for name in names {
                    if *self.shutdown.borrow() {
                        break;
                    }
                    self.process(&name).await;
                }
            }
            Action::FullDrain => self.drain_spool().await,
            Action::DemoteToPoll => {
                warn!("change notification lost; polling for the remainder of the run");
                self.source = ChangeSource::Poll(PollScan::new(self.layout.root()));
            }
            Action::SleepPollInterval => tokio::time::sleep(POLL_SLEEP).await,
        }
    }

    async fn process(&mut self, name: &str) {
        if let Err(err) =
            triage::process_file(self.fs.as_ref(), &self.layout, &mut self.importer, name).await
        {
            warn!(file = %name, error = %err, "failed to process spool file");
        }
    }

    /// Re-list the directory until a pass yields no unprocessed file.
    ///
    /// Iterative on purpose: under bursty arrival the re-check must not
    /// grow the stack. Files that triage leaves in place (skips) are
    /// remembered so they terminate the drain instead of looping it.
    async fn drain_spool(&mut self) {
        debug!("starting full spool drain");
        let mut handled: HashSet<String> = HashSet::new();

        loop {
            if *self.shutdown.borrow() {
                return;
            }
            let names = match self.fs.list_files(self.layout.root()) {
                Ok(names) => names,
                Err(err) => {
                    warn!(error = %err, "failed to list spool directory");
                    return;
                }
            };

            let fresh: Vec<String> = names
                .into_iter()
                .filter(|name| !handled.contains(name))
                .collect();
            if fresh.is_empty() {
                break;
            }

            for name in fresh {
                if *self.shutdown.borrow() {
                    return;
                }
                self.process(&name).await;
                handled.insert(name);
            }
        }

        debug!(seen = handled.len(), "spool drain complete");
    }
}
