//! Version gate over the Extended region.
//!
//! Decides whether the mapped memory was written by a plugin this crate can
//! read. The check is pure: it reads the current bytes, so calling it again
//! after a plugin reload gives a fresh answer.

use crate::config::PodConfig;
use crate::layout::ExtendedRecord;
use crate::text_utils::decode_c_string;
use crate::PodError;
use crate::types::{CompatibilityVerdict, SharedMemoryVersion, VersionParseError, VersionStatus};
use tracing::{debug, trace, warn};

/// Check the Extended region against `config.minimum_version`.
///
/// `None` (region not mapped) is treated the same as an empty version buffer.
pub fn check<E: ExtendedRecord>(ext: Option<&E>, config: &PodConfig) -> CompatibilityVerdict {
    let Some(ext) = ext else {
        return not_present(config);
    };

    let raw = decode_c_string(ext.version());
    if raw.is_empty() {
        return not_present(config);
    }

    let found: SharedMemoryVersion = match raw.parse() {
        Ok(version) => version,
        Err(reason) => return corrupt(raw, reason, config),
    };

    let minimum = config.minimum_version;
    if !found.meets(&minimum) {
        debug!(%found, %minimum, "Shared memory plugin below minimum version");
        let message = format!(
            "Unsupported rFactor 2 Shared Memory version: {raw}  Minimum supported version is: {minimum}{}",
            config.help_text
        );
        return CompatibilityVerdict::new(VersionStatus::Unsupported { found, minimum }, message);
    }

    let mut message = format!("\nrFactor 2 Shared Memory\nversion: {raw} 64bit.");
    if ext.direct_memory_access_enabled() {
        if ext.scr_plugin_enabled() {
            message.push_str(&format!(
                "  Stock Car Rules plugin enabled. (DFT:{})",
                ext.scr_plugin_double_file_type()
            ));
        } else {
            message.push_str("  DMA enabled.");
        }
    }

    if !ext.is_64bit() {
        message.push_str("\nOnly 64bit version of rFactor 2 is supported.");
        return CompatibilityVerdict::new(VersionStatus::Not64Bit { found }, message);
    }

    trace!(%found, "Shared memory verified");
    CompatibilityVerdict::new(VersionStatus::Verified { found }, message)
}

/// Check the result of viewing the Extended region.
///
/// A region that is mapped but cannot be viewed (too small or misaligned for
/// the record) is reported as incompatible rather than absent.
pub fn check_mapped<E: ExtendedRecord>(
    ext: Result<Option<&E>, PodError>,
    config: &PodConfig,
) -> CompatibilityVerdict {
    match ext {
        Ok(ext) => check(ext, config),
        Err(e) => {
            warn!(error = %e, "Extended region does not match the record layout");
            let message = format!(
                "Incompatible rFactor 2 Shared Memory layout.  {e}{}",
                config.help_text
            );
            CompatibilityVerdict::new(VersionStatus::Incompatible { reason: e.to_string() }, message)
        }
    }
}

fn not_present(config: &PodConfig) -> CompatibilityVerdict {
    trace!("Shared memory version block empty");
    CompatibilityVerdict::new(
        VersionStatus::NotPresent,
        format!("\nrFactor 2 Shared Memory not present.{}", config.help_text),
    )
}

fn corrupt(raw: String, reason: VersionParseError, config: &PodConfig) -> CompatibilityVerdict {
    debug!(version = %raw, %reason, "Corrupt shared memory version string");
    let message = match reason {
        VersionParseError::WrongComponentCount { .. } => format!(
            "Corrupt or leaked rFactor 2 Shared Memory.  Version string: {raw}{}",
            config.help_text
        ),
        VersionParseError::InvalidComponent { .. } => format!(
            "Corrupt or leaked rFactor 2 Shared Memory version.  Version string: {raw}{}",
            config.help_text
        ),
    };
    CompatibilityVerdict::new(VersionStatus::Corrupt { raw, reason }, message)
}
