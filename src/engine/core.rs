// src/engine/core.rs

//! Pure decision core of the event loop.
//!
//! [`Controller`] consumes [`Signal`]s and produces [`Action`]s for the IO
//! shell. It owns the loop-carried state: the active watch mode and the
//! time of the last full scan. It has no channels, no Tokio types, and
//! performs no IO, so the mode transitions and the overflow/safety-rescan
//! policy can be tested without a filesystem or a watcher.

use std::time::Instant;

use crate::types::WatchMode;
use crate::watch::Signal;

use super::FULL_SCAN_INTERVAL;

/// Command produced by the core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Triage these files, one by one.
    ProcessFiles(Vec<String>),
    /// Re-list the directory until a pass yields no unprocessed file.
    FullDrain,
    /// Swap the active change source to polling, permanently.
    DemoteToPoll,
    /// Sleep for the fixed polling interval before the next signal wait.
    SleepPollInterval,
}

/// Decision returned by the core for one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub actions: Vec<Action>,
}

impl Step {
    fn of(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

#[derive(Debug)]
pub struct Controller {
    mode: WatchMode,
    last_full_scan: Option<Instant>,
}

impl Controller {
    pub fn new(mode: WatchMode) -> Self {
        Self {
            mode,
            last_full_scan: None,
        }
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    /// Actions to run once before the first signal wait.
    ///
    /// Notification mode starts with a catch-up drain: files that arrived
    /// while the daemon was down produce no events and would otherwise wait
    /// for the first safety re-scan. Poll mode drains on its first pass
    /// anyway.
    pub fn startup(&mut self, now: Instant) -> Step {
        match self.mode {
            WatchMode::Notification => {
                self.last_full_scan = Some(now);
                Step::of(vec![Action::FullDrain])
            }
            WatchMode::Poll => Step::of(Vec::new()),
        }
    }

    /// Decide what the shell should do for one signal.
    pub fn on_signal(&mut self, signal: Signal, now: Instant) -> Step {
        match self.mode {
            WatchMode::Poll => self.on_poll_signal(signal, now),
            WatchMode::Notification => self.on_notification_signal(signal, now),
        }
    }

    /// Polling: every listing is handled as an exhaustive drain (files may
    /// arrive mid-scan), followed by the fixed sleep.
    fn on_poll_signal(&mut self, signal: Signal, now: Instant) -> Step {
        match signal {
            Signal::Names(_) | Signal::Overflow => {
                self.last_full_scan = Some(now);
                Step::of(vec![Action::FullDrain, Action::SleepPollInterval])
            }
            // A poll source produces neither of these; absorb them.
            Signal::Timeout | Signal::Error => {
                Step::of(vec![Action::SleepPollInterval])
            }
        }
    }

    fn on_notification_signal(&mut self, signal: Signal, now: Instant) -> Step {
        match signal {
            Signal::Names(names) => {
                if names.is_empty() {
                    Step::of(Vec::new())
                } else {
                    Step::of(vec![Action::ProcessFiles(names)])
                }
            }
            Signal::Overflow => {
                // The subscription was re-armed by the source before it
                // reported the overflow; one exhaustive drain covers every
                // event the kernel dropped.
                self.last_full_scan = Some(now);
                Step::of(vec![Action::FullDrain])
            }
            Signal::Timeout => {
                if self.full_scan_due(now) {
                    self.last_full_scan = Some(now);
                    Step::of(vec![Action::FullDrain])
                } else {
                    Step::of(Vec::new())
                }
            }
            Signal::Error => {
                self.mode = WatchMode::Poll;
                Step::of(vec![Action::DemoteToPoll])
            }
        }
    }

    fn full_scan_due(&self, now: Instant) -> bool {
        match self.last_full_scan {
            None => true,
            Some(last) => now.duration_since(last) >= FULL_SCAN_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Signal {
        Signal::Names(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn notification_names_are_processed_individually() {
        let mut ctl = Controller::new(WatchMode::Notification);
        let step = ctl.on_signal(names(&["a_1.cdr.xml", "b_2.cdr.xml"]), Instant::now());
        assert_eq!(
            step.actions,
            vec![Action::ProcessFiles(vec![
                "a_1.cdr.xml".to_string(),
                "b_2.cdr.xml".to_string(),
            ])]
        );
    }

    #[test]
    fn overflow_triggers_exactly_one_full_drain() {
        let mut ctl = Controller::new(WatchMode::Notification);
        let now = Instant::now();

        let step = ctl.on_signal(Signal::Overflow, now);
        assert_eq!(step.actions, vec![Action::FullDrain]);

        // Immediately afterwards a timeout must not re-drain.
        let step = ctl.on_signal(Signal::Timeout, now);
        assert!(step.actions.is_empty());

        // Normal signal-driven operation resumes.
        let step = ctl.on_signal(names(&["a_1.cdr.xml"]), now);
        assert_eq!(
            step.actions,
            vec![Action::ProcessFiles(vec!["a_1.cdr.xml".to_string()])]
        );
        assert_eq!(ctl.mode(), WatchMode::Notification);
    }

    #[test]
    fn timeout_drains_once_the_safety_interval_elapsed() {
        let mut ctl = Controller::new(WatchMode::Notification);
        let start = Instant::now();
        ctl.startup(start);

        let step = ctl.on_signal(Signal::Timeout, start + FULL_SCAN_INTERVAL / 2);
        assert!(step.actions.is_empty());

        let step = ctl.on_signal(Signal::Timeout, start + FULL_SCAN_INTERVAL);
        assert_eq!(step.actions, vec![Action::FullDrain]);
    }

    #[test]
    fn notification_error_demotes_permanently() {
        let mut ctl = Controller::new(WatchMode::Notification);
        let now = Instant::now();

        let step = ctl.on_signal(Signal::Error, now);
        assert_eq!(step.actions, vec![Action::DemoteToPoll]);
        assert_eq!(ctl.mode(), WatchMode::Poll);

        // Later signals follow poll semantics; no way back.
        let step = ctl.on_signal(names(&["a_1.cdr.xml"]), now);
        assert_eq!(
            step.actions,
            vec![Action::FullDrain, Action::SleepPollInterval]
        );
        assert_eq!(ctl.mode(), WatchMode::Poll);
    }

    #[test]
    fn poll_mode_drains_and_sleeps_on_every_listing() {
        let mut ctl = Controller::new(WatchMode::Poll);
        let step = ctl.on_signal(names(&[]), Instant::now());
        assert_eq!(
            step.actions,
            vec![Action::FullDrain, Action::SleepPollInterval]
        );
    }

    #[test]
    fn startup_in_notification_mode_is_a_catchup_drain() {
        let mut ctl = Controller::new(WatchMode::Notification);
        let now = Instant::now();
        assert_eq!(ctl.startup(now).actions, vec![Action::FullDrain]);

        // The catch-up counts as the last full scan.
        let step = ctl.on_signal(Signal::Timeout, now);
        assert!(step.actions.is_empty());
    }

    #[test]
    fn startup_in_poll_mode_does_nothing_special() {
        let mut ctl = Controller::new(WatchMode::Poll);
        assert!(ctl.startup(Instant::now()).actions.is_empty());
    }
}
