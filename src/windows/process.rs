//! Process enumeration through ToolHelp snapshots

use crate::{PodError, Result};
use tracing::warn;
use windows::Win32::Foundation::{CloseHandle, ERROR_INVALID_PARAMETER};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows::core::PWSTR;

pub(crate) fn pids() -> Vec<u32> {
    let snapshot = match unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) } {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "CreateToolhelp32Snapshot failed");
            return Vec::new();
        }
    };

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };
    let mut pids = Vec::new();

    unsafe {
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                pids.push(entry.th32ProcessID);
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        let _ = CloseHandle(snapshot);
    }

    pids
}

/// Image file name of `pid`.
///
/// `OpenProcess` rejects a pid that no longer exists with
/// `ERROR_INVALID_PARAMETER`; that is `Ok(None)`. Any other failure, access
/// denied in particular, means the process is there but cannot be queried.
pub(crate) fn process_name(pid: u32) -> Result<Option<String>> {
    let handle = match unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) } {
        Ok(handle) => handle,
        Err(e) if e.code() == ERROR_INVALID_PARAMETER.to_hresult() => return Ok(None),
        Err(e) => return Err(PodError::process(pid, format!("OpenProcess: {e}"))),
    };

    let mut buffer = [0u16; 1024];
    let mut len = buffer.len() as u32;
    let queried = unsafe {
        QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, PWSTR(buffer.as_mut_ptr()), &mut len)
    };
    unsafe {
        let _ = CloseHandle(handle);
    }
    queried.map_err(|e| PodError::process(pid, format!("QueryFullProcessImageNameW: {e}")))?;

    let path = String::from_utf16_lossy(&buffer[..len as usize]);
    Ok(path.rsplit('\\').next().map(str::to_string))
}

#[cfg(all(test, windows))]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_listed_and_named() {
        let me = std::process::id();
        assert!(pids().contains(&me));
        let name = process_name(me).unwrap().expect("own process should be queryable");
        assert!(name.to_lowercase().ends_with(".exe"));
    }

    #[test]
    fn exited_pid_has_no_name() {
        // Pids are multiples of four, so this one is never assigned.
        assert!(matches!(process_name(u32::MAX - 2), Ok(None)));
    }
}
