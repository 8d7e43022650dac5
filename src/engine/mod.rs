// src/engine/mod.rs

//! Orchestration engine for cdrwatch.
//!
//! This module ties together:
//! - the connection guard (no triage while the store is down)
//! - the active change source and its signals
//! - triage and the importer call
//! - overflow handling and the periodic safety re-scan
//!
//! The pure decision logic lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

pub mod core;
pub mod runtime;

pub use core::{Action, Controller, Step};
pub use runtime::EventLoop;

pub use crate::types::WatchMode;

/// Sleep between polling passes; the scan itself is not rate limited.
pub const POLL_SLEEP: Duration = Duration::from_millis(100);

/// Safety net in notification mode: a full directory scan at least this
/// often, regardless of notification activity.
pub const FULL_SCAN_INTERVAL: Duration = Duration::from_secs(300);

/// Runtime options used by the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, perform one full drain and exit (used for `--once`).
    pub drain_once: bool,
}
