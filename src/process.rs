//! Locating the server process.
//!
//! Scanning the process list is O(number of processes), so the liveness
//! monitor only calls into here on a duty cycle.

use crate::Result;
use tracing::{debug, trace};

/// Read access to the operating system's process list.
pub trait ProcessTable {
    /// Identifiers of all live processes.
    fn pids(&self) -> Vec<u32>;

    /// Executable name of `pid`, or `Ok(None)` if it no longer exists.
    ///
    /// A process that exists but cannot be queried (for example another
    /// user's process without sufficient privileges) is a
    /// [`PodError::Process`](crate::PodError::Process).
    fn process_name(&self, pid: u32) -> Result<Option<String>>;
}

impl<T: ProcessTable + ?Sized> ProcessTable for &T {
    fn pids(&self) -> Vec<u32> {
        (**self).pids()
    }

    fn process_name(&self, pid: u32) -> Result<Option<String>> {
        (**self).process_name(pid)
    }
}

impl<T: ProcessTable + ?Sized> ProcessTable for Box<T> {
    fn pids(&self) -> Vec<u32> {
        (**self).pids()
    }

    fn process_name(&self, pid: u32) -> Result<Option<String>> {
        (**self).process_name(pid)
    }
}

/// Case-insensitive prefix match of a process name against the target executable.
pub fn name_matches(process_name: &str, executable: &str) -> bool {
    process_name.to_lowercase().starts_with(&executable.to_lowercase())
}

/// First pid whose process name matches `executable`.
///
/// Processes that exit between enumeration and the name lookup, or that
/// cannot be queried, are skipped. If several servers are running the first
/// one enumerated wins.
pub fn find_candidate_pid(table: &impl ProcessTable, executable: &str) -> Option<u32> {
    let pids = table.pids();
    trace!(processes = pids.len(), executable, "Scanning process list");

    for pid in pids {
        let name = match table.process_name(pid) {
            Ok(Some(name)) => name,
            Ok(None) => continue,
            Err(e) => {
                trace!(pid, error = %e, "Skipping unqueryable process");
                continue;
            }
        };
        if name_matches(&name, executable) {
            debug!(pid, name = name.as_str(), "Found server process");
            return Some(pid);
        }
    }
    None
}

/// All matching server pids. Scanning stops at the first hit, so the list
/// holds at most one entry.
pub fn find_all_servers(table: &impl ProcessTable, executable: &str) -> Vec<u32> {
    find_candidate_pid(table, executable).into_iter().collect()
}

/// The host operating system's process list.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn pids(&self) -> Vec<u32> {
        #[cfg(windows)]
        {
            crate::windows::process::pids()
        }
        #[cfg(unix)]
        {
            crate::posix::process::pids()
        }
        #[cfg(not(any(windows, unix)))]
        {
            Vec::new()
        }
    }

    fn process_name(&self, pid: u32) -> Result<Option<String>> {
        #[cfg(windows)]
        {
            crate::windows::process::process_name(pid)
        }
        #[cfg(unix)]
        {
            crate::posix::process::process_name(pid)
        }
        #[cfg(not(any(windows, unix)))]
        {
            let _ = pid;
            Ok(None)
        }
    }
}
