//! Engine benchmarks.
//!
//! Measures the two operations a display loop calls every tick: one
//! macro step and one chronological snapshot of the history window.
//!
//! Run with: cargo bench --bench engine_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rotorsim::physics::{CoupledRotators, DormandPrince};
use rotorsim::prelude::*;

/// One macro step per preset. Chaotic presets take more substeps.
fn bench_macro_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("macro_step");
    group.sample_size(100);
    group.confidence_level(0.95);

    for preset in [Preset::FallingFromTop, Preset::InPhase, Preset::Whirling] {
        group.bench_with_input(BenchmarkId::new("step", preset), &preset, |b, &preset| {
            let config = RotorConfig::builder()
                .initial(preset.initial_conditions())
                .build();
            let mut engine = RotorEngine::new(config).unwrap();
            b.iter(|| black_box(engine.step()));
        });
    }

    group.finish();
}

/// Raw integrator cost across one `dt`, without history ingestion.
fn bench_integrator(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrator");
    group.sample_size(100);

    for rtol in [1e-5, 1e-7, 1e-9] {
        group.bench_with_input(BenchmarkId::new("dopri5_dt", rtol), &rtol, |b, &rtol| {
            let solver = DormandPrince::<4>::new(rtol, 1e-6, 10_000);
            let system = CoupledRotators::new(PhysicalParams::default());
            let y0 = [2.5, 0.0, -1.0, 1.0];
            b.iter(|| black_box(solver.clone().integrate(&system, 0.0, &y0, 0.02)));
        });
    }

    group.finish();
}

/// Snapshot read-out at increasing occupancy.
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_snapshot");
    group.sample_size(100);

    for steps in [10_u64, 250, 1000] {
        group.bench_with_input(BenchmarkId::new("snapshot", steps), &steps, |b, &steps| {
            let mut engine = RotorEngine::new(RotorConfig::default()).unwrap();
            engine.run_steps(steps);
            b.iter(|| black_box(engine.history_snapshot()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_macro_step, bench_integrator, bench_snapshot);
criterion_main!(benches);
