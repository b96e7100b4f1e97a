//! Criterion benchmarks for FunnelLab hot paths.
//!
//! Benchmarks:
//! 1. Grid run (sorted vs unsorted, full vs subsampled)
//! 2. Indicator cache build
//! 3. Rolling extremes (deque vs scan)
//! 4. Stage0 scoring over a large grid

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use funnellab_core::domain::{BarSeries, ParameterMatrix};
use funnellab_core::engine::{run_grid, CostModel, DonchianAtrKernel, ExecutionOptions};
use funnellab_core::indicators::{rolling_max, rolling_max_scan, IndicatorCache};
use funnellab_core::stage0::score_stage0;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> BarSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.01)
        .collect();
    BarSeries::from_closes(&closes, 1.5).unwrap()
}

fn make_grid(channels: usize, atrs: usize, stops: usize) -> ParameterMatrix {
    let mut rows = Vec::with_capacity(channels * atrs * stops);
    // interleave so the sorter has work to do
    for s in 0..stops {
        for a in 0..atrs {
            for c in 0..channels {
                rows.push(vec![
                    (10 + 5 * c) as f64,
                    (7 + 7 * a) as f64,
                    1.0 + 0.5 * s as f64,
                ]);
            }
        }
    }
    ParameterMatrix::from_rows(&rows).unwrap()
}

// ── 1. Grid run ──────────────────────────────────────────────────────

fn bench_grid(c: &mut Criterion) {
    let bars = make_bars(2_000);
    let params = make_grid(10, 4, 5);
    let costs = CostModel::new(1.0, 0.02, 1.0);
    let mut group = c.benchmark_group("run_grid");

    for (label, opts) in [
        ("sorted_full", ExecutionOptions::default()),
        (
            "unsorted_full",
            ExecutionOptions {
                sort_params: false,
                ..ExecutionOptions::default()
            },
        ),
        (
            "sorted_subsample_25",
            ExecutionOptions::default().with_subsample(0.25, 42),
        ),
        (
            "sorted_triggers_10",
            ExecutionOptions::default().with_triggers(0.1, 42),
        ),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                run_grid(
                    black_box(&bars),
                    black_box(&params),
                    &costs,
                    &DonchianAtrKernel,
                    opts,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

// ── 2. Indicator cache ───────────────────────────────────────────────

fn bench_cache(c: &mut Criterion) {
    let bars = make_bars(5_000);
    let params = make_grid(20, 8, 2);
    c.bench_function("indicator_cache_build", |b| {
        b.iter(|| IndicatorCache::build(black_box(&bars), black_box(&params)).unwrap())
    });
}

// ── 3. Rolling extremes ──────────────────────────────────────────────

fn bench_rolling(c: &mut Criterion) {
    let bars = make_bars(10_000);
    let mut group = c.benchmark_group("rolling_max");
    for window in [20i64, 100, 250] {
        group.bench_with_input(BenchmarkId::new("deque", window), &window, |b, &w| {
            b.iter(|| rolling_max(black_box(bars.high()), w))
        });
        group.bench_with_input(BenchmarkId::new("scan", window), &window, |b, &w| {
            b.iter(|| rolling_max_scan(black_box(bars.high()), w))
        });
    }
    group.finish();
}

// ── 4. Stage0 ────────────────────────────────────────────────────────

fn bench_stage0(c: &mut Criterion) {
    let bars = make_bars(2_000);
    let params = make_grid(40, 25, 1);
    c.bench_function("stage0_1000_rows", |b| {
        b.iter(|| score_stage0(black_box(bars.close()), black_box(&params)))
    });
}

criterion_group!(benches, bench_grid, bench_cache, bench_rolling, bench_stage0);
criterion_main!(benches);
