//! Outcome of a shared memory compatibility check

use super::{SharedMemoryVersion, VersionParseError};

/// Classification of the Extended region's version block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    /// Version buffer empty, or the region is not mapped at all.
    NotPresent,
    /// Version string present but malformed.
    Corrupt { raw: String, reason: VersionParseError },
    /// The region is mapped but cannot be read as the Extended record,
    /// usually because it is smaller than the record.
    Incompatible { reason: String },
    /// Parsed fine but below the configured minimum.
    Unsupported { found: SharedMemoryVersion, minimum: SharedMemoryVersion },
    /// Supported version published by a 32-bit plugin.
    Not64Bit { found: SharedMemoryVersion },
    /// Supported version from a 64-bit plugin.
    Verified { found: SharedMemoryVersion },
}

/// Result of a compatibility check: a flag plus a message for the operator.
///
/// Verdicts are recomputed on every check since the plugin can rewrite the
/// region at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityVerdict {
    pub verified: bool,
    pub status: VersionStatus,
    pub message: String,
}

impl CompatibilityVerdict {
    pub(crate) fn new(status: VersionStatus, message: String) -> Self {
        let verified = matches!(status, VersionStatus::Verified { .. });
        Self { verified, status, message }
    }

    /// The version found in shared memory, if it parsed.
    pub fn version(&self) -> Option<SharedMemoryVersion> {
        match &self.status {
            VersionStatus::Unsupported { found, .. }
            | VersionStatus::Not64Bit { found }
            | VersionStatus::Verified { found } => Some(*found),
            VersionStatus::NotPresent
            | VersionStatus::Corrupt { .. }
            | VersionStatus::Incompatible { .. } => None,
        }
    }
}
