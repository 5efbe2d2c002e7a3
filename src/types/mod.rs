//! Core value types shared across the crate.
//!
//! - [`SharedMemoryVersion`] is the four-part plugin version with the
//!   weighted comparison used for version negotiation
//! - [`CompatibilityVerdict`] is what the version gate reports: a flag, a
//!   classification and an operator-facing message
//!
//! ```rust
//! use rf2_pod::types::SharedMemoryVersion;
//!
//! let found: SharedMemoryVersion = "3.7.15.1".parse().unwrap();
//! assert!(found.meets(&SharedMemoryVersion::new(3, 6, 0, 0)));
//! assert_eq!(found.weighted_value(), 3_07_15_01);
//! ```

mod verdict;
mod version;

pub use verdict::{CompatibilityVerdict, VersionStatus};
pub use version::{SharedMemoryVersion, VERSION_COMPONENTS, VersionParseError};
