//! Named file mapping views

use super::wide_string;
use crate::region::Segment;
use crate::{PodError, Result};
use std::ptr::NonNull;
use tracing::{debug, trace};
use windows::Win32::Foundation::{CloseHandle, ERROR_FILE_NOT_FOUND, HANDLE};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile,
    OpenFileMappingW, UnmapViewOfFile, VirtualQuery,
};
use windows::core::PCWSTR;

/// A read-only view of a named file mapping.
pub struct MappedView {
    name: String,
    mapping: HANDLE,
    base: NonNull<u8>,
    len: usize,
    released: bool,
}

impl MappedView {
    /// Open and map `name`, or `Ok(None)` if no mapping with that name exists.
    pub fn open(name: &str) -> Result<Option<Self>> {
        trace!(name, "Opening file mapping");

        let mapping = unsafe {
            let wide_name = wide_string(name);
            match OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr())) {
                Ok(handle) => handle,
                Err(e) if e.code() == ERROR_FILE_NOT_FOUND.to_hresult() => return Ok(None),
                Err(e) => return Err(PodError::windows_api_error("OpenFileMappingW", e)),
            }
        };

        let base = unsafe {
            let view = MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, 0);
            match NonNull::new(view.Value as *mut u8) {
                Some(base) => base,
                None => {
                    let win_err = windows::core::Error::from_thread();
                    let _ = CloseHandle(mapping);
                    return Err(PodError::windows_api_error("MapViewOfFile", win_err));
                }
            }
        };

        let mut info = MEMORY_BASIC_INFORMATION::default();
        let queried = unsafe {
            VirtualQuery(
                Some(base.as_ptr() as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };

        let mut view = Self { name: name.to_string(), mapping, base, len: 0, released: false };
        if queried == 0 {
            let win_err = windows::core::Error::from_thread();
            let _ = view.release();
            return Err(PodError::windows_api_error("VirtualQuery", win_err));
        }
        view.len = info.RegionSize;

        debug!(name, len = view.len, "Mapped file mapping view");
        Ok(Some(view))
    }
}

impl Segment for MappedView {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes(&self) -> &[u8] {
        if self.released {
            return &[];
        }
        // SAFETY: base..base+len is the committed view reported by VirtualQuery
        // and stays mapped until release().
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
        let unmapped = unsafe { UnmapViewOfFile(addr) };
        let closed = unsafe { CloseHandle(self.mapping) };

        unmapped.map_err(|e| PodError::windows_api_error("UnmapViewOfFile", e))?;
        closed.map_err(|e| PodError::windows_api_error("CloseHandle", e))
    }
}

impl Drop for MappedView {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
