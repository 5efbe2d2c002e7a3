//! Accessor over one rFactor 2 server's shared memory.

use crate::config::PodConfig;
use crate::gate;
use crate::layout::{
    ExtendedRecord, RegionKind, ScoringRecord, ScoringVehicle, ServerLayout, TelemetryRecord,
    VehicleControl,
};
use crate::liveness::{LivenessMonitor, LivenessState};
use crate::process::{ProcessTable, SystemProcessTable, find_candidate_pid};
use crate::region::{Region, SegmentProvider, SystemSegments};
use crate::text_utils::decode_c_string;
use crate::types::CompatibilityVerdict;
use crate::Result;
use tracing::{info, warn};

type ScoringVehicleOf<L> = <<L as ServerLayout>::Scor as ScoringRecord>::Vehicle;
type TelemetryVehicleOf<L> = <<L as ServerLayout>::Tele as TelemetryRecord>::Vehicle;

/// Read access to the Extended, Scoring and Telemetry regions of a server.
///
/// Every region is optional: if the server is not running or has no plugin
/// loaded, accessors return empty slices, `None` or `false`. Views borrow the
/// pod, so none can be held across [`close`](Self::close).
pub struct Pod<L: ServerLayout, P: ProcessTable = SystemProcessTable> {
    config: PodConfig,
    ext: Region<L::Ext>,
    scor: Region<L::Scor>,
    tele: Region<L::Tele>,
    processes: P,
    liveness: LivenessMonitor,
    verified: bool,
    version_check_message: String,
}

impl<L: ServerLayout> Pod<L> {
    /// Map the regions of the server `pid` (or the unsuffixed regions when
    /// `pid` is `None`) using the operating system backends.
    pub fn connect(pid: Option<u32>, config: PodConfig) -> Result<Self> {
        let segments = SystemSegments::new(config.shm_dir.clone());
        Self::with_backends(pid, config, &segments, SystemProcessTable)
    }

    /// Find the server process by name, then map its regions.
    pub fn locate(config: PodConfig) -> Result<Self> {
        let pid = find_candidate_pid(&SystemProcessTable, &config.server_executable);
        if pid.is_none() {
            info!(executable = config.server_executable.as_str(), "No server process found");
        }
        Self::connect(pid, config)
    }
}

impl<L: ServerLayout, P: ProcessTable> Pod<L, P> {
    /// Build a pod over explicit segment and process backends.
    pub fn with_backends(
        pid: Option<u32>,
        config: PodConfig,
        segments: &dyn SegmentProvider,
        processes: P,
    ) -> Result<Self> {
        config.validate()?;

        let suffix = if config.pid_suffixed_regions { pid } else { None };
        let ext = Region::open(RegionKind::Extended, RegionKind::Extended.mapping_name(suffix), segments)?;
        let scor = Region::open(RegionKind::Scoring, RegionKind::Scoring.mapping_name(suffix), segments)?;
        let tele =
            Region::open(RegionKind::Telemetry, RegionKind::Telemetry.mapping_name(suffix), segments)?;

        let mut pod = Self {
            config,
            ext,
            scor,
            tele,
            processes,
            liveness: LivenessMonitor::with_pid(pid),
            verified: false,
            version_check_message: String::new(),
        };
        pod.version_check_message = pod.version_check().message;
        info!(pid = ?pid, verified = pod.verified, "Shared memory pod opened");
        Ok(pod)
    }

    pub fn config(&self) -> &PodConfig {
        &self.config
    }

    pub fn process_table(&self) -> &P {
        &self.processes
    }

    /// Pid of the server, if known and not seen to exit.
    pub fn server_pid(&self) -> Option<u32> {
        self.liveness.pid()
    }

    pub fn liveness_state(&self) -> LivenessState {
        self.liveness.state()
    }

    /// Re-run the version gate against the current contents of the Extended region.
    pub fn version_check(&mut self) -> CompatibilityVerdict {
        let verdict = gate::check_mapped(self.ext.try_view(), &self.config);
        self.verified = verdict.verified;
        verdict
    }

    /// Message from the version check made when the pod was opened.
    pub fn version_check_message(&self) -> &str {
        &self.version_check_message
    }

    /// True when the mapped memory comes from a supported 64-bit plugin.
    pub fn is_shared_memory_available(&mut self) -> bool {
        self.version_check();
        self.verified
    }

    /// Whether the server is running, using the configured poll intervals.
    pub fn is_running(&mut self) -> bool {
        self.is_running_with(self.config.find_interval, self.config.up_interval)
    }

    /// Whether the server is running.
    ///
    /// `find_interval`: polls between process checks while not running.
    /// `up_interval`: polls between process checks once running.
    pub fn is_running_with(&mut self, find_interval: u32, up_interval: u32) -> bool {
        let verified = self.is_shared_memory_available();
        self.liveness.poll(
            verified,
            &self.processes,
            &self.config.server_executable,
            find_interval,
            up_interval,
        )
    }

    /// Mapped Extended record.
    pub fn extended(&self) -> Option<&L::Ext> {
        self.ext.view()
    }

    /// Mapped Scoring record.
    pub fn scoring(&self) -> Option<&L::Scor> {
        self.scor.view()
    }

    /// Mapped Telemetry record.
    pub fn telemetry(&self) -> Option<&L::Tele> {
        self.tele.view()
    }

    /// True once a session has started and the track is loaded.
    pub fn is_track_loaded(&self) -> bool {
        self.extended().is_some_and(ExtendedRecord::session_started)
    }

    /// True while the player is in the car rather than at the monitor.
    pub fn is_on_track(&self) -> bool {
        self.extended().is_some_and(ExtendedRecord::in_realtime)
    }

    /// Every scoring slot, populated or not.
    pub fn drivers(&self) -> &[ScoringVehicleOf<L>] {
        self.scoring().map(ScoringRecord::vehicles).unwrap_or(&[])
    }

    /// Scoring slots up to the reported vehicle count.
    pub fn active_drivers(&self) -> &[ScoringVehicleOf<L>] {
        match self.scoring() {
            Some(scoring) => {
                let vehicles = scoring.vehicles();
                &vehicles[..scoring.num_vehicles().min(vehicles.len())]
            }
            None => &[],
        }
    }

    /// Every telemetry slot.
    pub fn players_vehicle_telemetry(&self) -> &[TelemetryVehicleOf<L>] {
        self.telemetry().map(TelemetryRecord::vehicles).unwrap_or(&[])
    }

    /// Slot of the first populated vehicle flagged as the player.
    pub fn player_index(&self) -> Option<usize> {
        self.active_drivers().iter().position(ScoringVehicle::is_player)
    }

    pub fn players_vehicle_scoring(&self) -> Option<&ScoringVehicleOf<L>> {
        self.player_index().and_then(|index| self.drivers().get(index))
    }

    /// Telemetry slot matching the player's scoring slot.
    pub fn player_telemetry(&self) -> Option<&TelemetryVehicleOf<L>> {
        self.player_index().and_then(|index| self.players_vehicle_telemetry().get(index))
    }

    /// True when the local AI is driving the player's car.
    pub fn is_ai_driving(&self) -> bool {
        self.players_vehicle_scoring()
            .is_some_and(|vehicle| vehicle.control() == VehicleControl::LocalAi)
    }

    /// Decoded name of the player's driver.
    pub fn driver_name(&self) -> Option<String> {
        self.players_vehicle_scoring().map(|vehicle| decode_c_string(vehicle.driver_name()))
    }

    /// True once every region has been released (or was never mapped).
    pub fn is_closed(&self) -> bool {
        !self.ext.is_open() && !self.scor.is_open() && !self.tele.is_open()
    }

    /// Release all three regions. Safe to call repeatedly.
    ///
    /// Each region is released even if an earlier one fails; the first
    /// failure is returned.
    pub fn close(&mut self) -> Result<()> {
        let tele = self.tele.close();
        let scor = self.scor.close();
        let ext = self.ext.close();
        self.verified = false;
        tele.and(scor).and(ext)
    }
}

impl<L: ServerLayout, P: ProcessTable> Drop for Pod<L, P> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to release shared memory on drop");
        }
    }
}

impl<L: ServerLayout, P: ProcessTable> std::fmt::Debug for Pod<L, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pod")
            .field("ext", &self.ext)
            .field("scor", &self.scor)
            .field("tele", &self.tele)
            .field("liveness", &self.liveness)
            .field("verified", &self.verified)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        FixtureExt, FixtureLayout, FixtureScor, FixtureTele, FixtureVehicleTelemetry,
        MemorySegments, ReleaseOutcome, ScriptedProcesses,
    };
    use crate::PodError;

    const PID: u32 = 4242;

    fn name(kind: RegionKind) -> String {
        kind.mapping_name(Some(PID))
    }

    fn scoring_with_player() -> FixtureScor {
        let mut scor = FixtureScor::default();
        scor.push_driver("Remote Racer", false, VehicleControl::Remote);
        scor.push_driver("Kimi Räikkönen", true, VehicleControl::LocalAi);
        scor
    }

    fn telemetry() -> FixtureTele {
        let mut tele = FixtureTele { num_vehicles: 2, ..FixtureTele::default() };
        tele.vehicles[0] = FixtureVehicleTelemetry { id: 0, gear: 3, engine_rpm: 7000.0 };
        tele.vehicles[1] = FixtureVehicleTelemetry { id: 1, gear: 5, engine_rpm: 9100.0 };
        tele
    }

    fn full_segments(ext: FixtureExt) -> MemorySegments {
        MemorySegments::new()
            .with_record(&name(RegionKind::Extended), &ext)
            .with_record(&name(RegionKind::Scoring), &scoring_with_player())
            .with_record(&name(RegionKind::Telemetry), &telemetry())
    }

    fn open(segments: &MemorySegments, processes: ScriptedProcesses) -> Pod<FixtureLayout, ScriptedProcesses> {
        let _ = tracing_subscriber::fmt::try_init();
        Pod::with_backends(Some(PID), PodConfig::default(), segments, processes).unwrap()
    }

    #[test]
    fn absent_shared_memory_degrades_to_no_data() {
        let segments = MemorySegments::new();
        let mut pod = open(&segments, ScriptedProcesses::new());

        assert!(!pod.is_shared_memory_available());
        assert!(pod.version_check_message().contains("not present"));
        assert!(!pod.is_track_loaded());
        assert!(!pod.is_on_track());
        assert!(pod.drivers().is_empty());
        assert!(pod.players_vehicle_telemetry().is_empty());
        assert_eq!(pod.driver_name(), None);
        assert!(pod.is_closed());
    }

    #[test]
    fn verified_pod_exposes_all_regions() {
        let ext = FixtureExt::with_version("3.7.15.1").with_session_started(true).with_realtime(true);
        let segments = full_segments(ext);
        let mut pod = open(&segments, ScriptedProcesses::new());

        assert!(pod.is_shared_memory_available());
        assert!(pod.version_check_message().contains("version: 3.7.15.1 64bit."));
        assert!(pod.is_track_loaded());
        assert!(pod.is_on_track());
        assert_eq!(pod.drivers().len(), crate::test_utils::FIXTURE_MAX_VEHICLES);
        assert_eq!(pod.active_drivers().len(), 2);
        assert_eq!(pod.player_index(), Some(1));
        assert_eq!(pod.driver_name().as_deref(), Some("Kimi Räikkönen"));
        assert!(pod.is_ai_driving());
        assert_eq!(pod.player_telemetry().map(|v| v.gear), Some(5));
        assert_eq!(pod.players_vehicle_telemetry()[0].engine_rpm, 7000.0);
    }

    #[test]
    fn unsuffixed_regions_when_configured() {
        let segments = MemorySegments::new()
            .with_record(RegionKind::Extended.base_name(), &FixtureExt::with_version("3.7.15.1"));
        let config = PodConfig::default().with_pid_suffixed_regions(false);
        let mut pod: Pod<FixtureLayout, ScriptedProcesses> =
            Pod::with_backends(Some(PID), config, &segments, ScriptedProcesses::new()).unwrap();
        assert!(pod.is_shared_memory_available());
    }

    #[test]
    fn undersized_extended_region_is_incompatible() {
        let segments = MemorySegments::new()
            .with_bytes(&name(RegionKind::Extended), b"3.7.15.1\0\0\0\0".to_vec());
        let mut pod = open(&segments, ScriptedProcesses::new());

        let verdict = pod.version_check();
        assert!(!verdict.verified);
        assert!(matches!(verdict.status, crate::VersionStatus::Incompatible { .. }));
        assert!(verdict.message.contains("is 12 bytes, record needs 24"));
        assert!(!verdict.message.contains("not present"));
        assert!(pod.version_check_message().starts_with("Incompatible rFactor 2 Shared Memory layout."));
        assert!(!pod.is_shared_memory_available());
        assert!(!pod.is_track_loaded());
    }

    #[test]
    fn outdated_plugin_is_not_available() {
        let segments = full_segments(FixtureExt::with_version("3.5.9.9"));
        let mut pod = open(&segments, ScriptedProcesses::new());
        assert!(!pod.is_shared_memory_available());
        assert!(pod.version_check_message().contains("Minimum supported version is: 3.6.0.0"));
        // Data is still readable; trusting it is up to the caller.
        assert_eq!(pod.active_drivers().len(), 2);
    }

    #[test]
    fn close_twice_never_fails() {
        let segments = full_segments(FixtureExt::with_version("3.7.15.1"));
        let mut pod = open(&segments, ScriptedProcesses::new());
        assert!(!pod.is_closed());

        pod.close().unwrap();
        assert!(pod.is_closed());
        assert!(pod.drivers().is_empty());
        assert!(!pod.is_shared_memory_available());
        pod.close().unwrap();

        drop(pod);
        assert_eq!(segments.release_count(&name(RegionKind::Extended)), 1);
        assert_eq!(segments.release_count(&name(RegionKind::Telemetry)), 1);
    }

    #[test]
    fn close_swallows_outstanding_views_and_releases_everything() {
        let segments = full_segments(FixtureExt::with_version("3.7.15.1"))
            .with_release_outcome(&name(RegionKind::Telemetry), ReleaseOutcome::ViewsOutstanding);
        let mut pod = open(&segments, ScriptedProcesses::new());
        pod.close().unwrap();
        assert!(pod.is_closed());
    }

    #[test]
    fn close_reports_real_failures_after_releasing_all() {
        let segments = full_segments(FixtureExt::with_version("3.7.15.1"))
            .with_release_outcome(&name(RegionKind::Telemetry), ReleaseOutcome::Fail);
        let mut pod = open(&segments, ScriptedProcesses::new());

        assert!(matches!(pod.close(), Err(PodError::SharedMemory { .. })));
        assert!(pod.is_closed());
        assert_eq!(segments.release_count(&name(RegionKind::Extended)), 1);
        pod.close().unwrap();
    }

    #[test]
    fn running_follows_verified_memory_then_process_checks() {
        let segments = full_segments(FixtureExt::with_version("3.7.15.1"));
        let processes = ScriptedProcesses::new().with_process(PID, "rFactor2 Dedicated.exe");
        let mut pod = open(&segments, processes);

        assert!(pod.is_running());
        assert_eq!(pod.liveness_state(), LivenessState::ConsideredUp);
        assert_eq!(pod.process_table().scans(), 0);

        pod.close().unwrap();
        pod.process_table().kill(PID);
        let went_down = (0..pod.config().up_interval).any(|_| !pod.is_running());
        assert!(went_down);
        assert_eq!(pod.server_pid(), None);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PodConfig::default().with_intervals(0, 5);
        let result: Result<Pod<FixtureLayout, ScriptedProcesses>> =
            Pod::with_backends(None, config, &MemorySegments::new(), ScriptedProcesses::new());
        assert!(matches!(result, Err(PodError::Config { .. })));
    }
}
