//! Duty-cycled server liveness detection.
//!
//! Callers poll at frame rate, far too often for a process scan. A verified
//! version block proves a live writer on its own, so the operating system is
//! only consulted on a counter: every `find_interval` polls while the server
//! is believed down, every `up_interval` polls while it is believed up.

use crate::process::{ProcessTable, find_candidate_pid, name_matches};
use tracing::{debug, info, trace};

/// What the monitor currently believes about the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LivenessState {
    #[default]
    NeverChecked,
    ConsideredDown,
    ConsideredUp,
}

/// Tracks the server pid and the poll counter between process checks.
#[derive(Debug, Clone, Default)]
pub struct LivenessMonitor {
    pid: Option<u32>,
    counter: u32,
    state: LivenessState,
    process_checks: u64,
}

impl LivenessMonitor {
    /// A monitor that has not located the server yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A monitor for an already discovered server pid.
    pub fn with_pid(pid: Option<u32>) -> Self {
        Self { pid, ..Self::default() }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LivenessState::ConsideredUp
    }

    /// Number of times the operating system was consulted.
    pub fn process_checks(&self) -> u64 {
        self.process_checks
    }

    /// Advance one poll and report whether the server is considered running.
    ///
    /// `verified` is the latest version gate result; when set the server is
    /// up without asking the operating system.
    pub fn poll(
        &mut self,
        verified: bool,
        table: &impl ProcessTable,
        executable: &str,
        find_interval: u32,
        up_interval: u32,
    ) -> bool {
        if self.state == LivenessState::NeverChecked {
            self.counter = find_interval;
        }

        if verified {
            self.transition(LivenessState::ConsideredUp, "shared memory verified");
            self.counter = self.counter.saturating_add(1);
            return true;
        }

        let interval = match self.state {
            LivenessState::ConsideredUp => up_interval,
            LivenessState::NeverChecked | LivenessState::ConsideredDown => find_interval,
        };

        if self.counter >= interval {
            self.counter = 0;
            let next = self.check_process(table, executable);
            self.transition(next, "process check");
        } else {
            trace!(counter = self.counter, interval, "Skipping process check");
        }

        self.counter = self.counter.saturating_add(1);
        self.is_running()
    }

    fn check_process(&mut self, table: &impl ProcessTable, executable: &str) -> LivenessState {
        self.process_checks += 1;

        let Some(pid) = self.pid else {
            return match find_candidate_pid(table, executable) {
                Some(pid) => {
                    self.pid = Some(pid);
                    LivenessState::ConsideredUp
                }
                None => LivenessState::ConsideredDown,
            };
        };

        match table.process_name(pid) {
            Ok(Some(name)) if name_matches(&name, executable) => LivenessState::ConsideredUp,
            Ok(Some(name)) => {
                debug!(pid, name = name.as_str(), "Server pid reused by another process");
                self.pid = None;
                LivenessState::ConsideredDown
            }
            Ok(None) => {
                debug!(pid, "Server process vanished");
                self.pid = None;
                LivenessState::ConsideredDown
            }
            Err(e) => {
                // The process exists; only its name is hidden from us.
                debug!(pid, error = %e, "Server process not queryable, keeping pid");
                LivenessState::ConsideredUp
            }
        }
    }

    fn transition(&mut self, next: LivenessState, reason: &str) {
        if next != self.state {
            info!(from = ?self.state, to = ?next, pid = ?self.pid, reason, "Server liveness changed");
            self.state = next;
        }
    }
}
