// src/watch/notification.rs

//! Kernel change-notification subscription on the spool directory.
//!
//! Subscribes non-recursively for "file closed after write" and "file moved
//! into directory" — both mean a producer is done with the file, so a
//! reader never races an in-progress writer. The kernel queue is bounded;
//! under bursty arrival (tens of thousands of files) it overflows, which
//! the backend surfaces as a rescan flag. Overflow invalidates every
//! buffered event, so it is reported as a single [`Signal::Overflow`] after
//! the subscription has been re-armed.

use std::path::PathBuf;
use std::time::Duration;

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, warn};

use super::Signal;
use crate::errors::Result;

/// Messages bridged from the blocking notify callback into the async loop.
enum WatchMessage {
    Event(Event),
    Lost(String),
}

pub struct NotificationWatch {
    watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<WatchMessage>,
    root: PathBuf,
}

impl NotificationWatch {
    /// Install the subscription on `root`.
    ///
    /// Any setup failure here makes the caller fall back to polling.
    pub fn subscribe(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let (tx, rx) = mpsc::unbounded_channel::<WatchMessage>();

        // Closure called synchronously by notify whenever an event arrives.
        let mut watcher = RecommendedWatcher::new(
            {
                let tx = tx.clone();
                move |res: notify::Result<Event>| {
                    let msg = match res {
                        Ok(event) => WatchMessage::Event(event),
                        Err(err) => WatchMessage::Lost(err.to_string()),
                    };
                    // Receiver gone means the loop is shutting down.
                    let _ = tx.send(msg);
                }
            },
            Config::default(),
        )?;

        watcher.watch(&root, RecursiveMode::NonRecursive)?;

        Ok(Self { watcher, rx, root })
    }

    /// Block up to `timeout` for events, then drain everything pending.
    pub async fn wait_for_signal(&mut self, timeout: Duration) -> Signal {
        let first = match tokio::time::timeout(timeout, self.rx.recv()).await {
            Err(_) => return Signal::Timeout,
            Ok(None) => return Signal::Error,
            Ok(Some(msg)) => msg,
        };

        let mut names = Vec::new();

        match self.collect(first, &mut names) {
            Drained::Keep => {}
            Drained::Overflow => return self.handle_overflow(),
            Drained::Failed => return Signal::Error,
        }

        // Drain whatever else is already buffered for this wakeup.
        loop {
            match self.rx.try_recv() {
                Ok(msg) => match self.collect(msg, &mut names) {
                    Drained::Keep => {}
                    Drained::Overflow => return self.handle_overflow(),
                    Drained::Failed => return Signal::Error,
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Signal::Error,
            }
        }

        Signal::Names(names)
    }

    fn collect(&mut self, msg: WatchMessage, names: &mut Vec<String>) -> Drained {
        let event = match msg {
            WatchMessage::Event(event) => event,
            WatchMessage::Lost(err) => {
                warn!(error = %err, "change notification stream failed");
                return Drained::Failed;
            }
        };

        if event.need_rescan() {
            return Drained::Overflow;
        }

        match event.kind {
            EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for path in &event.paths {
                    if let Some(name) = path.file_name() {
                        names.push(name.to_string_lossy().into_owned());
                    }
                }
            }
            other => {
                // Diagnostic visibility only; no file processing.
                debug!(kind = ?other, "ignoring notification event");
            }
        }

        Drained::Keep
    }

    /// Overflow invalidates the whole buffered batch: discard it, re-arm the
    /// subscription to clear residual queued state, and report upward.
    fn handle_overflow(&mut self) -> Signal {
        warn!("notification queue overflowed; forcing a full rescan");
        while self.rx.try_recv().is_ok() {}
        if let Err(err) = self.rearm() {
            warn!(error = %err, "failed to re-arm subscription after overflow");
            return Signal::Error;
        }
        Signal::Overflow
    }

    fn rearm(&mut self) -> Result<()> {
        self.watcher.unwatch(&self.root)?;
        self.watcher.watch(&self.root, RecursiveMode::NonRecursive)?;
        Ok(())
    }
}

enum Drained {
    Keep,
    Overflow,
    Failed,
}

impl std::fmt::Debug for NotificationWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationWatch")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
