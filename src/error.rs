//! Error types for shared memory access.
//!
//! Most of what can go wrong when talking to an rFactor 2 server is *not* an
//! error: a missing segment or a vanished process is represented as `None`,
//! and a malformed or outdated version block becomes a
//! [`CompatibilityVerdict`](crate::CompatibilityVerdict). The variants below
//! cover the remaining operational failures.
//!
//! ## Error Categories
//!
//! - **Shared Memory Errors**: a segment exists but could not be mapped
//! - **Layout Errors**: a segment is too small for the record mapped over it
//! - **Release Errors**: tearing down a mapping failed
//! - **Process Errors**: a process could not be queried
//! - **Configuration Errors**: invalid [`PodConfig`](crate::PodConfig) values
//!
//! ```rust
//! use rf2_pod::PodError;
//!
//! let error = PodError::views_outstanding("$rFactor2SMMP_Scoring$");
//! assert!(error.is_benign_release());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for shared memory operations.
pub type Result<T, E = PodError> = std::result::Result<T, E>;

/// Main error type for shared memory operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PodError {
    #[error("Failed to map shared memory segment '{name}'")]
    SharedMemory {
        name: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Segment '{name}' is {found} bytes, record needs {expected}")]
    LayoutMismatch { name: String, expected: usize, found: usize },

    #[error("Cannot release '{name}': views into the buffer still exist")]
    ViewsOutstanding { name: String },

    #[error("Process {pid} query failed: {reason}")]
    Process { pid: u32, reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl PodError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            PodError::SharedMemory { .. } => true,
            PodError::ViewsOutstanding { .. } => true,
            PodError::Process { .. } => true,
            PodError::Io(_) => true,
            PodError::LayoutMismatch { .. } => false,
            PodError::Config { .. } => false,
            PodError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            PodError::WindowsApi { .. } => true,
        }
    }

    /// The one release failure that `close()` is allowed to ignore.
    pub fn is_benign_release(&self) -> bool {
        matches!(self, PodError::ViewsOutstanding { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PodError::SharedMemory { .. } => vec![
                "Ensure the rFactor 2 server is running",
                "Check permissions for shared memory access",
                "Verify rFactor2SharedMemoryMapPlugin64.dll is enabled",
            ],
            PodError::LayoutMismatch { .. } => vec![
                "Update rFactor2SharedMemoryMapPlugin64.dll",
                "Check the record layout matches the plugin version",
            ],
            PodError::ViewsOutstanding { .. } => {
                vec!["Drop borrowed vehicle views before closing", "Safe to ignore at shutdown"]
            }
            PodError::Process { .. } => vec![
                "Check the process still exists",
                "Run with sufficient privileges to query other processes",
            ],
            PodError::Config { .. } => vec![
                "Check interval values are greater than zero",
                "Use a dotted four part minimum version such as 3.6.0.0",
            ],
            PodError::UnsupportedPlatform { .. } => vec![
                "Use platform-appropriate features",
                "Check documentation for platform requirements",
            ],
            #[cfg(windows)]
            PodError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "Verify system resources availability",
            ],
            PodError::Io(_) => vec!["Check the shared memory directory exists and is readable"],
        }
    }

    /// Helper constructor for mapping failures.
    pub fn shared_memory(name: impl Into<String>) -> Self {
        PodError::SharedMemory { name: name.into(), source: None }
    }

    /// Helper constructor for mapping failures with source.
    pub fn shared_memory_with_source(
        name: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        PodError::SharedMemory { name: name.into(), source: Some(source) }
    }

    /// Helper constructor for undersized segments.
    pub fn layout_mismatch(name: impl Into<String>, expected: usize, found: usize) -> Self {
        PodError::LayoutMismatch { name: name.into(), expected, found }
    }

    /// Helper constructor for the benign release race.
    pub fn views_outstanding(name: impl Into<String>) -> Self {
        PodError::ViewsOutstanding { name: name.into() }
    }

    /// Helper constructor for process query failures.
    pub fn process(pid: u32, reason: impl Into<String>) -> Self {
        PodError::Process { pid, reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        PodError::Config { reason: reason.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        PodError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        PodError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

#[cfg(windows)]
impl From<core::Error> for PodError {
    fn from(err: core::Error) -> Self {
        PodError::WindowsApi { operation: "Unknown Windows operation".to_string(), source: err }
    }
}
