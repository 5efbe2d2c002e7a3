//! Consumer-side access to rFactor 2 dedicated server shared memory.
//!
//! The rFactor 2 Shared Memory Map plugin publishes three regions from inside
//! the server process: Extended (plugin version and state flags), Scoring and
//! Telemetry. This crate handles the access discipline around them:
//!
//! - **Mapping**: open the named regions read-only, treating a missing region
//!   as "no data" rather than an error, and release them exactly once
//! - **Validation**: check the plugin version and bit width on every call,
//!   since the plugin can be reloaded under a running reader
//! - **Liveness**: decide whether the server is running without scanning the
//!   process list on every poll
//! - **Strings**: decode fixed-size C strings that may be UTF-8 or
//!   Windows-1252
//!
//! The binary layouts of the regions are supplied by the caller through the
//! [`ServerLayout`] family of traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use rf2_pod::{Pod, PodConfig};
//!
//! let mut pod = Pod::<MyLayout>::locate(PodConfig::default())?;
//! println!("{}", pod.version_check_message());
//!
//! loop {
//!     if pod.is_running() && pod.is_shared_memory_available() && pod.is_track_loaded() {
//!         for driver in pod.active_drivers() {
//!             // ...
//!         }
//!     }
//! }
//! ```

mod config;
mod error;
pub mod gate;
pub mod layout;
pub mod liveness;
mod pod;
pub mod process;
pub mod region;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod text_utils;
pub mod types;

// Platform-specific modules
#[cfg(unix)]
pub mod posix;
#[cfg(windows)]
pub mod windows;

pub use config::{DEFAULT_HELP_TEXT, DEFAULT_MINIMUM_VERSION, DEFAULT_SERVER_EXECUTABLE, PodConfig};
pub use error::*;
pub use layout::{
    ExtendedRecord, RegionKind, ScoringRecord, ScoringVehicle, ServerLayout, SharedRecord,
    TelemetryRecord, VehicleControl,
};
pub use liveness::{LivenessMonitor, LivenessState};
pub use pod::Pod;
pub use process::{ProcessTable, SystemProcessTable, find_all_servers, find_candidate_pid};
pub use region::{Region, RegionState, Segment, SegmentProvider, SystemSegments};
pub use text_utils::decode_c_string;
pub use types::{CompatibilityVerdict, SharedMemoryVersion, VersionParseError, VersionStatus};
