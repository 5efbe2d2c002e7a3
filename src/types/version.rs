//! Shared memory plugin version strings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of dot-separated components in a plugin version.
pub const VERSION_COMPONENTS: usize = 4;

/// Positional weight base used to fold a version into a single integer.
const COMPONENT_BASE: u64 = 100;

/// Why a version string could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("expected {VERSION_COMPONENTS} components, found {found}")]
    WrongComponentCount { found: usize },

    #[error("component {index} ('{text}') is not a non-negative integer")]
    InvalidComponent { index: usize, text: String },
}

/// A `major.minor.patch.build` version as published in the Extended region.
///
/// Ordering goes through [`weighted_value`](Self::weighted_value), the same
/// folding the plugin uses for its own negotiation. Components of 100 or more
/// overlap their neighbour and compare incorrectly; this is accepted, not
/// corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SharedMemoryVersion {
    parts: [u32; VERSION_COMPONENTS],
}

impl SharedMemoryVersion {
    /// Build a version from its components, most significant first.
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self { parts: [major, minor, patch, build] }
    }

    /// Components, most significant first.
    pub fn parts(&self) -> [u32; VERSION_COMPONENTS] {
        self.parts
    }

    /// Sum of `component * 100^(3 - index)`.
    pub fn weighted_value(&self) -> u64 {
        self.parts.iter().fold(0u64, |acc, &part| acc * COMPONENT_BASE + u64::from(part))
    }

    /// Whether this version is at least `minimum` under weighted comparison.
    pub fn meets(&self, minimum: &SharedMemoryVersion) -> bool {
        self.weighted_value() >= minimum.weighted_value()
    }
}

impl FromStr for SharedMemoryVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pieces: Vec<&str> = s.split('.').collect();
        if pieces.len() != VERSION_COMPONENTS {
            return Err(VersionParseError::WrongComponentCount { found: pieces.len() });
        }

        let mut parts = [0u32; VERSION_COMPONENTS];
        for (index, (slot, piece)) in parts.iter_mut().zip(&pieces).enumerate() {
            *slot = piece.trim().parse().map_err(|_| VersionParseError::InvalidComponent {
                index,
                text: (*piece).to_string(),
            })?;
        }
        Ok(Self { parts })
    }
}

impl TryFrom<String> for SharedMemoryVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SharedMemoryVersion> for String {
    fn from(version: SharedMemoryVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for SharedMemoryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, build] = self.parts;
        write!(f, "{major}.{minor}.{patch}.{build}")
    }
}
