//! Access configuration

use crate::types::SharedMemoryVersion;
use crate::{PodError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Oldest plugin version whose layout this crate understands.
pub const DEFAULT_MINIMUM_VERSION: SharedMemoryVersion = SharedMemoryVersion::new(3, 6, 0, 0);

/// Executable name of the dedicated server, compared as a lower-case prefix.
pub const DEFAULT_SERVER_EXECUTABLE: &str = "rfactor2 dedicated.exe";

/// Appended to every "not present", "corrupt" and "unsupported" message.
pub const DEFAULT_HELP_TEXT: &str = "\nShared Memory is installed by Crew Chief or you can install it yourself.\n\
Please update rFactor2SharedMemoryMapPlugin64.dll, see\n\
https://forum.studio-397.com/index.php?threads/rf2-shared-memory-tools-for-developers.54282/";

/// Immutable settings shared by every component of a [`Pod`](crate::Pod).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodConfig {
    /// Oldest plugin version accepted by the version gate.
    pub minimum_version: SharedMemoryVersion,

    /// Guidance appended to failed compatibility messages.
    pub help_text: String,

    /// Process name prefix identifying the server.
    pub server_executable: String,

    /// Polls between process checks while the server is believed down.
    pub find_interval: u32,

    /// Polls between process checks while the server is believed up.
    pub up_interval: u32,

    /// Append the server pid to region names when the pid is known.
    pub pid_suffixed_regions: bool,

    /// Directory backing named shared memory on POSIX systems.
    pub shm_dir: PathBuf,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            minimum_version: DEFAULT_MINIMUM_VERSION,
            help_text: DEFAULT_HELP_TEXT.to_string(),
            server_executable: DEFAULT_SERVER_EXECUTABLE.to_string(),
            find_interval: 200,
            up_interval: 5,
            pid_suffixed_regions: true,
            shm_dir: PathBuf::from("/dev/shm"),
        }
    }
}

impl PodConfig {
    /// Parse and validate a YAML configuration. Missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PodConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| PodError::config(format!("YAML parse failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| PodError::config(format!("YAML serialization failed: {e}")))
    }

    /// Check the values that would otherwise break polling or matching.
    pub fn validate(&self) -> Result<()> {
        if self.find_interval == 0 || self.up_interval == 0 {
            return Err(PodError::config(format!(
                "poll intervals must be non-zero (find_interval={}, up_interval={})",
                self.find_interval, self.up_interval
            )));
        }
        if self.server_executable.trim().is_empty() {
            return Err(PodError::config("server_executable must not be empty"));
        }
        Ok(())
    }

    pub fn with_minimum_version(mut self, minimum_version: SharedMemoryVersion) -> Self {
        self.minimum_version = minimum_version;
        self
    }

    pub fn with_intervals(mut self, find_interval: u32, up_interval: u32) -> Self {
        self.find_interval = find_interval;
        self.up_interval = up_interval;
        self
    }

    pub fn with_shm_dir(mut self, shm_dir: impl Into<PathBuf>) -> Self {
        self.shm_dir = shm_dir.into();
        self
    }

    pub fn with_server_executable(mut self, server_executable: impl Into<String>) -> Self {
        self.server_executable = server_executable.into();
        self
    }

    pub fn with_pid_suffixed_regions(mut self, enabled: bool) -> Self {
        self.pid_suffixed_regions = enabled;
        self
    }
}
