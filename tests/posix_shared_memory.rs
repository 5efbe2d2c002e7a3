//! Integration tests for the POSIX shared memory backend
//!
//! Regions are written as files into a temporary directory standing in for
//! `/dev/shm`, then read back through [`Pod::connect`] exactly as a live
//! server's regions would be.

#![cfg(unix)]

use anyhow::{Context, Result};
use rf2_pod::{
    ExtendedRecord, Pod, PodConfig, ProcessTable, RegionKind, ScoringRecord, ScoringVehicle,
    ServerLayout, SharedRecord, SystemProcessTable, TelemetryRecord, VehicleControl,
};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct Ext {
    version: [u8; 12],
    is_64bit: u8,
    session_started: u8,
    pad: [u8; 2],
}

unsafe impl SharedRecord for Ext {}

impl ExtendedRecord for Ext {
    fn version(&self) -> &[u8] {
        &self.version
    }
    fn is_64bit(&self) -> bool {
        self.is_64bit != 0
    }
    fn session_started(&self) -> bool {
        self.session_started != 0
    }
    fn in_realtime(&self) -> bool {
        false
    }
    fn direct_memory_access_enabled(&self) -> bool {
        false
    }
    fn scr_plugin_enabled(&self) -> bool {
        false
    }
    fn scr_plugin_double_file_type(&self) -> i32 {
        0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct Vehicle {
    name: [u8; 16],
    is_player: u8,
    control: i8,
    pad: [u8; 2],
}

impl ScoringVehicle for Vehicle {
    fn is_player(&self) -> bool {
        self.is_player != 0
    }
    fn control(&self) -> VehicleControl {
        VehicleControl::from_raw(self.control)
    }
    fn driver_name(&self) -> &[u8] {
        &self.name
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct Scor {
    num_vehicles: i32,
    vehicles: [Vehicle; 4],
}

unsafe impl SharedRecord for Scor {}

impl ScoringRecord for Scor {
    type Vehicle = Vehicle;
    fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }
    fn num_vehicles(&self) -> usize {
        usize::try_from(self.num_vehicles).unwrap_or(0)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct Tele {
    speeds: [f32; 4],
}

unsafe impl SharedRecord for Tele {}

impl TelemetryRecord for Tele {
    type Vehicle = f32;
    fn vehicles(&self) -> &[f32] {
        &self.speeds
    }
}

enum TestLayout {}

impl ServerLayout for TestLayout {
    type Ext = Ext;
    type Scor = Scor;
    type Tele = Tele;
}

fn bytes_of<T: SharedRecord>(record: &T) -> &[u8] {
    unsafe { std::slice::from_raw_parts(record as *const T as *const u8, std::mem::size_of::<T>()) }
}

fn ext(version: &str) -> Ext {
    let mut ext = Ext { is_64bit: 1, session_started: 1, ..Ext::default() };
    ext.version[..version.len()].copy_from_slice(version.as_bytes());
    ext
}

/// Overwrite a region in place, like the plugin does, without truncating.
fn publish<T: SharedRecord>(dir: &Path, name: &str, record: &T) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(name))
        .with_context(|| format!("open {name}"))?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(bytes_of(record))?;
    file.flush()?;
    Ok(())
}

fn own_process_name() -> Result<String> {
    SystemProcessTable.process_name(std::process::id())?.context("own process name")
}

#[test]
fn reads_regions_published_as_files() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir()?;
    let pid = 31337;

    let mut scor = Scor { num_vehicles: 2, ..Scor::default() };
    scor.vehicles[0].name[..5].copy_from_slice(b"Alice");
    scor.vehicles[1].name[..3].copy_from_slice(b"Bob");
    scor.vehicles[1].is_player = 1;
    scor.vehicles[1].control = 1;

    publish(dir.path(), &RegionKind::Extended.mapping_name(Some(pid)), &ext("3.7.15.1"))?;
    publish(dir.path(), &RegionKind::Scoring.mapping_name(Some(pid)), &scor)?;
    publish(dir.path(), &RegionKind::Telemetry.mapping_name(Some(pid)), &Tele { speeds: [10.0, 55.5, 0.0, 0.0] })?;

    let config = PodConfig::default().with_shm_dir(dir.path());
    let mut pod = Pod::<TestLayout>::connect(Some(pid), config)?;

    assert!(pod.is_shared_memory_available(), "{}", pod.version_check_message());
    assert!(pod.is_track_loaded());
    assert_eq!(pod.active_drivers().len(), 2);
    assert_eq!(pod.driver_name().as_deref(), Some("Bob"));
    assert!(pod.is_ai_driving());
    assert_eq!(pod.player_telemetry().copied(), Some(55.5));

    pod.close()?;
    pod.close()?;
    assert!(pod.is_closed());
    assert!(pod.drivers().is_empty());
    Ok(())
}

#[test]
fn verdict_follows_plugin_rewrites() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ext_name = RegionKind::Extended.mapping_name(None);
    publish(dir.path(), &ext_name, &ext("3.7.15.1"))?;

    let config = PodConfig::default().with_shm_dir(dir.path());
    let mut pod = Pod::<TestLayout>::connect(None, config)?;
    assert!(pod.is_shared_memory_available());

    publish(dir.path(), &ext_name, &Ext::default())?;
    assert!(!pod.is_shared_memory_available());
    assert!(pod.version_check().message.contains("not present"));

    publish(dir.path(), &ext_name, &ext("3.5.9.9"))?;
    let verdict = pod.version_check();
    assert!(!verdict.verified);
    assert!(verdict.message.contains("3.5.9.9") && verdict.message.contains("3.6.0.0"));

    publish(dir.path(), &ext_name, &ext("3.6.0.1"))?;
    assert!(pod.is_shared_memory_available());
    Ok(())
}

#[test]
fn missing_regions_are_not_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PodConfig::default().with_shm_dir(dir.path());
    let mut pod = Pod::<TestLayout>::connect(Some(1), config)?;

    assert!(!pod.is_shared_memory_available());
    assert!(pod.version_check_message().contains("rFactor 2 Shared Memory not present."));
    assert!(pod.players_vehicle_telemetry().is_empty());
    pod.close()?;
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn liveness_tracks_a_real_process() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PodConfig::default()
        .with_shm_dir(dir.path())
        .with_server_executable(own_process_name()?);

    // No shared memory: liveness comes from the process list alone.
    let mut pod = Pod::<TestLayout>::connect(None, config)?;
    assert!(pod.is_running());
    assert_eq!(pod.server_pid(), Some(std::process::id()));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn unknown_server_is_down() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PodConfig::default()
        .with_shm_dir(dir.path())
        .with_server_executable("no such server binary.exe");

    let mut pod = Pod::<TestLayout>::connect(None, config)?;
    for _ in 0..10 {
        assert!(!pod.is_running());
    }
    assert_eq!(pod.server_pid(), None);
    Ok(())
}
