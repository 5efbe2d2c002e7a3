//! Test utilities: a fixture record layout, in-memory segments and a
//! scriptable process table.
//!
//! The fixture layout is deliberately small and padding-free so it can be
//! written to segments byte for byte. It is not the plugin's real layout.

#![cfg(any(test, feature = "benchmark"))]

use crate::layout::{
    ExtendedRecord, ScoringRecord, ScoringVehicle, ServerLayout, SharedRecord, TelemetryRecord,
    VehicleControl,
};
use crate::process::ProcessTable;
use crate::region::{Segment, SegmentProvider};
use crate::{PodError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Vehicle slots in the fixture scoring and telemetry records.
pub const FIXTURE_MAX_VEHICLES: usize = 8;

/// Bytes of a shared record, for writing fixtures into segments.
pub fn record_bytes<T: SharedRecord>(record: &T) -> &[u8] {
    // SAFETY: SharedRecord types are plain repr(C) data; fixture records have
    // no padding so every byte is initialised.
    unsafe { std::slice::from_raw_parts(record as *const T as *const u8, std::mem::size_of::<T>()) }
}

fn fill_c_string<const N: usize>(buffer: &mut [u8; N], text: &str) {
    *buffer = [0; N];
    let len = text.len().min(N - 1);
    buffer[..len].copy_from_slice(&text.as_bytes()[..len]);
}

/// Extended region fixture.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureExt {
    pub version: [u8; 12],
    pub is_64bit: u8,
    pub session_started: u8,
    pub in_realtime: u8,
    pub direct_memory_access_enabled: u8,
    pub scr_plugin_enabled: u8,
    pub pad: [u8; 3],
    pub scr_plugin_double_file_type: i32,
}

unsafe impl SharedRecord for FixtureExt {}

impl FixtureExt {
    /// A 64-bit plugin reporting `version`.
    pub fn with_version(version: &str) -> Self {
        let mut ext = Self { is_64bit: 1, ..Self::default() };
        ext.set_version(version);
        ext
    }

    pub fn set_version(&mut self, version: &str) {
        fill_c_string(&mut self.version, version);
    }

    pub fn with_64bit(mut self, is_64bit: bool) -> Self {
        self.is_64bit = u8::from(is_64bit);
        self
    }

    pub fn with_direct_memory_access(mut self, enabled: bool) -> Self {
        self.direct_memory_access_enabled = u8::from(enabled);
        self
    }

    pub fn with_scr_plugin(mut self, double_file_type: i32) -> Self {
        self.scr_plugin_enabled = 1;
        self.scr_plugin_double_file_type = double_file_type;
        self
    }

    pub fn with_session_started(mut self, started: bool) -> Self {
        self.session_started = u8::from(started);
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.in_realtime = u8::from(realtime);
        self
    }
}

impl ExtendedRecord for FixtureExt {
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
        self.in_realtime != 0
    }
    fn direct_memory_access_enabled(&self) -> bool {
        self.direct_memory_access_enabled != 0
    }
    fn scr_plugin_enabled(&self) -> bool {
        self.scr_plugin_enabled != 0
    }
    fn scr_plugin_double_file_type(&self) -> i32 {
        self.scr_plugin_double_file_type
    }
}

/// Scoring entry fixture.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureVehicleScoring {
    pub driver_name: [u8; 32],
    pub is_player: u8,
    pub control: i8,
    pub pad: [u8; 2],
}

impl ScoringVehicle for FixtureVehicleScoring {
    fn is_player(&self) -> bool {
        self.is_player != 0
    }
    fn control(&self) -> VehicleControl {
        VehicleControl::from_raw(self.control)
    }
    fn driver_name(&self) -> &[u8] {
        &self.driver_name
    }
}

/// Scoring region fixture.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureScor {
    pub num_vehicles: i32,
    pub vehicles: [FixtureVehicleScoring; FIXTURE_MAX_VEHICLES],
}

unsafe impl SharedRecord for FixtureScor {}

impl FixtureScor {
    /// Append a driver; returns its slot index.
    pub fn push_driver(&mut self, name: &str, is_player: bool, control: VehicleControl) -> usize {
        let index = self.num_vehicles as usize;
        let slot = &mut self.vehicles[index];
        fill_c_string(&mut slot.driver_name, name);
        slot.is_player = u8::from(is_player);
        slot.control = match control {
            VehicleControl::Nobody => -1,
            VehicleControl::LocalPlayer => 0,
            VehicleControl::LocalAi => 1,
            VehicleControl::Remote => 2,
            VehicleControl::Replay => 3,
            VehicleControl::Unknown(raw) => raw,
        };
        self.num_vehicles += 1;
        index
    }
}

impl ScoringRecord for FixtureScor {
    type Vehicle = FixtureVehicleScoring;

    fn vehicles(&self) -> &[FixtureVehicleScoring] {
        &self.vehicles
    }
    fn num_vehicles(&self) -> usize {
        usize::try_from(self.num_vehicles).unwrap_or(0)
    }
}

/// Telemetry entry fixture.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixtureVehicleTelemetry {
    pub id: i32,
    pub gear: i32,
    pub engine_rpm: f64,
}

/// Telemetry region fixture.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureTele {
    pub num_vehicles: i32,
    pub pad: i32,
    pub vehicles: [FixtureVehicleTelemetry; FIXTURE_MAX_VEHICLES],
}

unsafe impl SharedRecord for FixtureTele {}

impl TelemetryRecord for FixtureTele {
    type Vehicle = FixtureVehicleTelemetry;

    fn vehicles(&self) -> &[FixtureVehicleTelemetry] {
        &self.vehicles
    }
}

/// Layout binding the fixture records together.
#[derive(Debug)]
pub enum FixtureLayout {}

impl ServerLayout for FixtureLayout {
    type Ext = FixtureExt;
    type Scor = FixtureScor;
    type Tele = FixtureTele;
}

/// How an in-memory segment answers `release()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseOutcome {
    #[default]
    Ok,
    ViewsOutstanding,
    Fail,
}

/// Segment provider backed by heap buffers.
#[derive(Debug, Default)]
pub struct MemorySegments {
    segments: HashMap<String, Vec<u8>>,
    outcomes: HashMap<String, ReleaseOutcome>,
    releases: Rc<RefCell<Vec<String>>>,
}

impl MemorySegments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record<T: SharedRecord>(self, name: &str, record: &T) -> Self {
        self.with_bytes(name, record_bytes(record).to_vec())
    }

    pub fn with_bytes(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.segments.insert(name.to_string(), bytes);
        self
    }

    pub fn with_release_outcome(mut self, name: &str, outcome: ReleaseOutcome) -> Self {
        self.outcomes.insert(name.to_string(), outcome);
        self
    }

    /// How many times segments named `name` were released.
    pub fn release_count(&self, name: &str) -> usize {
        self.releases.borrow().iter().filter(|released| released.as_str() == name).count()
    }
}

impl SegmentProvider for MemorySegments {
    fn open(&self, name: &str) -> Result<Option<Box<dyn Segment>>> {
        let Some(bytes) = self.segments.get(name) else {
            return Ok(None);
        };

        // u64 backing keeps the buffer aligned like a page-aligned mapping.
        let mut buffer = vec![0u64; bytes.len().div_ceil(8)].into_boxed_slice();
        // SAFETY: buffer spans at least bytes.len() bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.as_mut_ptr() as *mut u8, bytes.len());
        }

        Ok(Some(Box::new(MemorySegment {
            name: name.to_string(),
            buffer,
            len: bytes.len(),
            outcome: self.outcomes.get(name).copied().unwrap_or_default(),
            releases: Rc::clone(&self.releases),
        })))
    }
}

struct MemorySegment {
    name: String,
    buffer: Box<[u64]>,
    len: usize,
    outcome: ReleaseOutcome,
    releases: Rc<RefCell<Vec<String>>>,
}

impl Segment for MemorySegment {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes(&self) -> &[u8] {
        // SAFETY: buffer holds at least len initialised bytes.
        unsafe { std::slice::from_raw_parts(self.buffer.as_ptr() as *const u8, self.len) }
    }

    fn release(&mut self) -> Result<()> {
        self.releases.borrow_mut().push(self.name.clone());
        match self.outcome {
            ReleaseOutcome::Ok => Ok(()),
            ReleaseOutcome::ViewsOutstanding => Err(PodError::views_outstanding(&self.name)),
            ReleaseOutcome::Fail => Err(PodError::shared_memory(&self.name)),
        }
    }
}

#[derive(Debug, Clone)]
enum ScriptedName {
    Named(String),
    Vanished,
    Inaccessible,
}

/// Process table driven by the test, counting every query.
#[derive(Debug, Default)]
pub struct ScriptedProcesses {
    processes: RefCell<Vec<(u32, ScriptedName)>>,
    scans: Cell<usize>,
    name_lookups: Cell<usize>,
}

impl ScriptedProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, name: &str) -> Self {
        self.spawn(pid, name);
        self
    }

    /// A pid that is enumerated but exits before its name can be read.
    pub fn with_vanished(self, pid: u32) -> Self {
        self.processes.borrow_mut().push((pid, ScriptedName::Vanished));
        self
    }

    /// A pid that exists but whose name cannot be read.
    pub fn with_inaccessible(self, pid: u32) -> Self {
        self.processes.borrow_mut().push((pid, ScriptedName::Inaccessible));
        self
    }

    pub fn spawn(&self, pid: u32, name: &str) {
        self.processes.borrow_mut().push((pid, ScriptedName::Named(name.to_string())));
    }

    /// Make a running process unqueryable, as if it changed owner.
    pub fn deny_access(&self, pid: u32) {
        for (candidate, name) in self.processes.borrow_mut().iter_mut() {
            if *candidate == pid {
                *name = ScriptedName::Inaccessible;
            }
        }
    }

    pub fn kill(&self, pid: u32) {
        self.processes.borrow_mut().retain(|(candidate, _)| *candidate != pid);
    }

    /// Number of full process list scans.
    pub fn scans(&self) -> usize {
        self.scans.get()
    }

    /// Number of single-pid name lookups.
    pub fn name_lookups(&self) -> usize {
        self.name_lookups.get()
    }
}

impl ProcessTable for ScriptedProcesses {
    fn pids(&self) -> Vec<u32> {
        self.scans.set(self.scans.get() + 1);
        self.processes.borrow().iter().map(|(pid, _)| *pid).collect()
    }

    fn process_name(&self, pid: u32) -> Result<Option<String>> {
        self.name_lookups.set(self.name_lookups.get() + 1);
        let processes = self.processes.borrow();
        match processes.iter().find(|(candidate, _)| *candidate == pid) {
            Some((_, ScriptedName::Named(name))) => Ok(Some(name.clone())),
            Some((_, ScriptedName::Inaccessible)) => Err(PodError::process(pid, "access denied")),
            Some((_, ScriptedName::Vanished)) | None => Ok(None),
        }
    }
}
