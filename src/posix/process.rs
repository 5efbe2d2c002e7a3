//! Process enumeration through `/proc`

use crate::{PodError, Result};
use std::fs;
use std::io;
use std::path::Path;

const PROC_ROOT: &str = "/proc";

/// `ESRCH`, returned when reading a `/proc` entry of a process that just exited.
const ESRCH: i32 = 3;

fn process_gone(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(ESRCH)
}

pub(crate) fn pids() -> Vec<u32> {
    let Ok(entries) = fs::read_dir(PROC_ROOT) else {
        return Vec::new();
    };

    let mut pids: Vec<u32> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .collect();
    pids.sort_unstable();
    pids
}

/// Executable base name of `pid`.
///
/// `comm` is truncated to 15 bytes, too short for names such as
/// `rFactor2 Dedicated.exe`, so argv[0] is preferred. Windows-style paths
/// passed by Wine are split on backslashes as well.
pub(crate) fn process_name(pid: u32) -> Result<Option<String>> {
    let base = Path::new(PROC_ROOT).join(pid.to_string());

    match fs::read(base.join("cmdline")) {
        Ok(cmdline) => {
            let argv0 = cmdline.split(|&b| b == 0).next().unwrap_or_default();
            if !argv0.is_empty() {
                let path = String::from_utf8_lossy(argv0);
                let name = path.rsplit(['/', '\\']).next().unwrap_or_default();
                return Ok(Some(name.to_string()));
            }
        }
        Err(e) if process_gone(&e) => return Ok(None),
        // Kernel threads and zombies have no argv; restricted ones may deny it.
        Err(_) => {}
    }

    match fs::read_to_string(base.join("comm")) {
        Ok(comm) => Ok(Some(comm.trim_end().to_string())),
        Err(e) if process_gone(&e) => Ok(None),
        Err(e) => Err(PodError::process(pid, e.to_string())),
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn enumerates_sorted_pids() {
        let pids = pids();
        assert!(!pids.is_empty());
        assert!(pids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn missing_pid_has_no_name() {
        assert!(matches!(process_name(u32::MAX), Ok(None)));
    }

    #[test]
    fn own_process_has_a_name() {
        let name = process_name(std::process::id()).unwrap();
        assert!(name.is_some_and(|name| !name.is_empty()));
    }
}
