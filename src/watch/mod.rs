// src/watch/mod.rs

//! Change detection for the spool directory.
//!
//! Two interchangeable strategies behind one contract:
//! - [`NotificationWatch`]: kernel change notification via `notify`,
//!   low latency, but its event queue is bounded and the facility can be
//!   missing entirely (some containers).
//! - [`PollScan`]: plain directory listing, the universal fallback.
//!
//! The loop selects a mode at startup and may demote to polling at runtime;
//! it never promotes back. A periodic full scan backs up notification mode
//! against missed or coalesced events.

use std::sync::Arc;
use std::time::Duration;

use crate::fs::FileSystem;
use crate::types::WatchMode;

pub mod notification;
pub mod poll;

pub use notification::NotificationWatch;
pub use poll::PollScan;

/// Upper bound on one blocking wait for notification events.
pub const NOTIFY_WAIT: Duration = Duration::from_secs(300);

/// Outcome of one `wait_for_signal` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Candidate file names, ready for triage.
    Names(Vec<String>),
    /// The kernel event queue overflowed; individual events are no longer
    /// trustworthy and the whole directory must be rescanned.
    Overflow,
    /// The bounded wait elapsed without any event.
    Timeout,
    /// The subscription failed irrecoverably; demote to polling.
    Error,
}

/// Tagged variant over the two detection strategies.
///
/// Keeps the event loop ignorant of which mode is active beyond the
/// returned [`Signal`].
pub enum ChangeSource {
    Notification(NotificationWatch),
    Poll(PollScan),
}

impl ChangeSource {
    pub fn mode(&self) -> WatchMode {
        match self {
            ChangeSource::Notification(_) => WatchMode::Notification,
            ChangeSource::Poll(_) => WatchMode::Poll,
        }
    }

    /// Wait for the next signal.
    ///
    /// Notification mode blocks up to [`NOTIFY_WAIT`]; poll mode returns a
    /// fresh listing immediately and relies on the caller for rate
    /// limiting.
    pub async fn wait_for_signal(&mut self, fs: &Arc<dyn FileSystem>) -> Signal {
        match self {
            ChangeSource::Notification(watch) => watch.wait_for_signal(NOTIFY_WAIT).await,
            ChangeSource::Poll(scan) => scan.scan(fs.as_ref()),
        }
    }
}

impl std::fmt::Debug for ChangeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChangeSource").field(&self.mode()).finish()
    }
}
