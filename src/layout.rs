//! Record layouts mapped over the plugin's shared memory regions.
//!
//! The binary structs themselves belong to the plugin's data definitions and
//! are supplied by the caller. This module only names the fields the access
//! layer reads, so any `#[repr(C)]` mirror of the plugin headers can be
//! plugged in through [`ServerLayout`].

use std::fmt;

/// Plain data that can be viewed directly over mapped bytes.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or `#[repr(C, packed)]`), contain no
/// pointers, references or padding-sensitive invariants, and every bit
/// pattern must be a valid value. Flags published as C `bool` must be
/// declared as `u8`.
pub unsafe trait SharedRecord: Sized + 'static {}

/// Fields of the Extended region used for version negotiation and state.
pub trait ExtendedRecord: SharedRecord {
    /// Fixed-size, null-terminated plugin version buffer (`mVersion`).
    fn version(&self) -> &[u8];
    /// Plugin reports being a 64-bit build (`is64bit`).
    fn is_64bit(&self) -> bool;
    /// A session is in progress (`mSessionStarted`).
    fn session_started(&self) -> bool;
    /// The player is driving rather than sitting in the monitor (`mInRealtimeFC`).
    fn in_realtime(&self) -> bool;
    /// `mDirectMemoryAccessEnabled`.
    fn direct_memory_access_enabled(&self) -> bool;
    /// `mSCRPluginEnabled`.
    fn scr_plugin_enabled(&self) -> bool;
    /// `mSCRPluginDoubleFileType`.
    fn scr_plugin_double_file_type(&self) -> i32;
}

/// Who is in control of a vehicle, as reported in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleControl {
    Nobody,
    LocalPlayer,
    LocalAi,
    Remote,
    Replay,
    Unknown(i8),
}

impl VehicleControl {
    pub fn from_raw(raw: i8) -> Self {
        match raw {
            -1 => VehicleControl::Nobody,
            0 => VehicleControl::LocalPlayer,
            1 => VehicleControl::LocalAi,
            2 => VehicleControl::Remote,
            3 => VehicleControl::Replay,
            other => VehicleControl::Unknown(other),
        }
    }
}

/// Per-vehicle scoring entry.
pub trait ScoringVehicle {
    /// `mIsPlayer`.
    fn is_player(&self) -> bool;
    /// `mControl`.
    fn control(&self) -> VehicleControl;
    /// `mDriverName` buffer.
    fn driver_name(&self) -> &[u8];
}

/// The Scoring region.
pub trait ScoringRecord: SharedRecord {
    type Vehicle: ScoringVehicle + 'static;

    /// The full fixed-size vehicle array (`mVehicles`).
    fn vehicles(&self) -> &[Self::Vehicle];
    /// Number of populated entries (`mScoringInfo.mNumVehicles`).
    fn num_vehicles(&self) -> usize;
}

/// The Telemetry region.
pub trait TelemetryRecord: SharedRecord {
    type Vehicle: 'static;

    /// The full fixed-size vehicle array (`mVehicles`).
    fn vehicles(&self) -> &[Self::Vehicle];
}

/// Ties the three region records of one plugin version together.
pub trait ServerLayout {
    type Ext: ExtendedRecord;
    type Scor: ScoringRecord;
    type Tele: TelemetryRecord;
}

/// The three regions published by the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Extended,
    Scoring,
    Telemetry,
}

impl RegionKind {
    /// Mapping name without any server suffix.
    pub fn base_name(self) -> &'static str {
        match self {
            RegionKind::Extended => "$rFactor2SMMP_Extended$",
            RegionKind::Scoring => "$rFactor2SMMP_Scoring$",
            RegionKind::Telemetry => "$rFactor2SMMP_Telemetry$",
        }
    }

    /// Mapping name, suffixed with the server pid when one is given.
    ///
    /// Dedicated servers publish one set of regions per process so several
    /// servers can share a machine.
    pub fn mapping_name(self, server_pid: Option<u32>) -> String {
        match server_pid {
            Some(pid) => format!("{}{}", self.base_name(), pid),
            None => self.base_name().to_string(),
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RegionKind::Extended => "Extended",
            RegionKind::Scoring => "Scoring",
            RegionKind::Telemetry => "Telemetry",
        };
        f.write_str(label)
    }
}
