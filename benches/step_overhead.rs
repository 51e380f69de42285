//! Checkpoint overhead benchmark
//!
//! Measures what a `step!()` costs in the two states that matter:
//!
//! 1. No traced scope: a single atomic load
//! 2. Inside a traced scope: clock read, accumulator update, and a source
//!    lookup the first time a line is seen
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench step_overhead
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lineprof::report::render;
use lineprof::{step, ColorMode, LineId, ProfileSnapshot, Session, TimingAccumulator};
use std::time::Duration;

fn bench_idle_checkpoint(c: &mut Criterion) {
    c.bench_function("checkpoint_idle", |b| {
        b.iter(|| {
            step!(black_box(()));
        })
    });
}

fn bench_active_checkpoint(c: &mut Criterion) {
    let session = Session::builder()
        .output(std::io::sink())
        .color(ColorMode::Never)
        .build();

    c.bench_function("checkpoint_active", |b| {
        let scope = match session.enter() {
            Ok(scope) => scope,
            Err(e) => panic!("cannot enter scope: {}", e),
        };
        b.iter(|| {
            step!(black_box(()));
        });
        drop(scope);
    });
}

fn bench_accumulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator_add");
    for lines in [1u32, 16, 256] {
        let ids: Vec<LineId> = (0..lines).map(|n| LineId::new("bench.rs", n)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(lines), &ids, |b, ids| {
            let mut timings = TimingAccumulator::new();
            let mut i = 0usize;
            b.iter(|| {
                timings.add(&ids[i % ids.len()], Duration::from_nanos(black_box(100)));
                i += 1;
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let snapshot: ProfileSnapshot = serde_json::from_value(serde_json::json!({
        "rows": (0..50).map(|n| serde_json::json!({
            "file": "bench.rs",
            "line": n,
            "percentage": 2.0,
            "seconds": 0.001,
            "text": format!("    let value_{} = compute({});", n, n),
        })).collect::<Vec<_>>(),
        "total_seconds": 0.05,
    }))
    .unwrap_or_default();

    c.bench_function("render_50_rows_color", |b| {
        b.iter(|| render(black_box(&snapshot), true))
    });
}

criterion_group!(
    benches,
    bench_idle_checkpoint,
    bench_active_checkpoint,
    bench_accumulator,
    bench_render
);
criterion_main!(benches);
