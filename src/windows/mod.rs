//! Windows shared memory and process access
//!
//! The plugin publishes its regions as named file mappings. They are opened
//! read-only with `OpenFileMappingW`/`MapViewOfFile`, sized with
//! `VirtualQuery`, and torn down with `UnmapViewOfFile`/`CloseHandle`.
//! Process lookups use a ToolHelp snapshot for enumeration and
//! `QueryFullProcessImageNameW` for single-pid checks.

pub(crate) mod process;
pub mod segment;

pub use segment::MappedView;

/// Convert string to null-terminated wide string for Windows APIs
pub(crate) fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
