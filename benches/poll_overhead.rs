//! Benchmarks for the per-frame polling path
//!
//! Consumers call these once per rendered frame, so they must stay cheap:
//! - Version gate over a mapped Extended record
//! - Liveness poll while verified and while down
//! - C string decoding on each fallback path
//!
//! Platform: Cross-platform (in-memory segments, CI-safe)

use criterion::{Criterion, criterion_group, criterion_main};
use rf2_pod::test_utils::{
    FixtureExt, FixtureLayout, FixtureScor, MemorySegments, ScriptedProcesses,
};
use rf2_pod::{LivenessMonitor, Pod, PodConfig, RegionKind, VehicleControl, decode_c_string, gate};
use std::hint::black_box;

const EXE: &str = "rfactor2 dedicated.exe";

fn bench_version_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_gate");
    let config = PodConfig::default();

    let verified = FixtureExt::with_version("3.7.15.1").with_direct_memory_access(true);
    group.bench_function("verified", |b| {
        b.iter(|| black_box(gate::check(Some(black_box(&verified)), &config)))
    });

    let corrupt = FixtureExt::with_version("3.x.15.1");
    group.bench_function("corrupt", |b| {
        b.iter(|| black_box(gate::check(Some(black_box(&corrupt)), &config)))
    });

    group.finish();
}

fn bench_liveness(c: &mut Criterion) {
    let mut group = c.benchmark_group("liveness_poll");

    let table = ScriptedProcesses::new().with_process(1, "init").with_process(2, "explorer.exe");
    group.bench_function("verified", |b| {
        let mut monitor = LivenessMonitor::new();
        b.iter(|| black_box(monitor.poll(true, &table, EXE, 200, 5)))
    });
    group.bench_function("down_duty_cycle", |b| {
        let mut monitor = LivenessMonitor::new();
        b.iter(|| black_box(monitor.poll(false, &table, EXE, 200, 5)))
    });

    group.finish();
}

fn bench_pod_frame(c: &mut Criterion) {
    let mut scor = FixtureScor::default();
    scor.push_driver("Bench Driver", true, VehicleControl::LocalPlayer);
    let segments = MemorySegments::new()
        .with_record(RegionKind::Extended.base_name(), &FixtureExt::with_version("3.7.15.1"))
        .with_record(RegionKind::Scoring.base_name(), &scor);
    let mut pod: Pod<FixtureLayout, ScriptedProcesses> =
        Pod::with_backends(None, PodConfig::default(), &segments, ScriptedProcesses::new())
            .expect("fixture pod should open");

    c.bench_function("pod_frame", |b| {
        b.iter(|| {
            let running = pod.is_running();
            let name = pod.driver_name();
            black_box((running, name))
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_c_string");

    let utf8 = *b"Kimi Raikkonen\0\0\0\0\0\0";
    group.bench_function("utf8", |b| b.iter(|| black_box(decode_c_string(black_box(&utf8)))));

    let cp1252 = [b'R', 0xE4, b'i', b'k', b'k', 0xF6, b'n', b'e', b'n', 0, 0, 0];
    group.bench_function("windows_1252", |b| {
        b.iter(|| black_box(decode_c_string(black_box(&cp1252))))
    });

    let garbage = [0x81u8, b'a', 0x8D, b'b', 0x9D, 0];
    group.bench_function("lossy", |b| b.iter(|| black_box(decode_c_string(black_box(&garbage)))));

    group.finish();
}

criterion_group!(benches, bench_version_gate, bench_liveness, bench_pod_frame, bench_decode);
criterion_main!(benches);
