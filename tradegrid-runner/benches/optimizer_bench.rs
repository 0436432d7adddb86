//! Criterion benchmarks for tradegrid hot paths.
//!
//! Run with: `cargo bench -p tradegrid-runner`
//!
//! Benchmarks:
//! 1. Single pipeline run (signals, positions, equity, summary)
//! 2. Full sweep, sequential vs parallel
//! 3. Grid enumeration

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tradegrid_core::domain::Instrument;
use tradegrid_core::strategy::{MaCross, PeriodParams};
use tradegrid_core::synthetic::sine_wave_series;
use tradegrid_runner::{run_backtest, Optimizer, ParameterGrid, PortfolioSettings};

fn portfolio() -> PortfolioSettings {
    PortfolioSettings::default()
        .with_initial_equity(10_000.0)
        .with_stop_loss(250)
}

fn bench_single_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_run");
    let instrument = Instrument::parse("SPY");
    let periods = PeriodParams::Ordered(vec![10, 50]);

    for size in [500, 2_500, 10_000] {
        let bars = sine_wave_series("SPY", size).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let _ = run_backtest::<MaCross>(
                    &instrument,
                    black_box(bars.clone()),
                    &periods,
                    &portfolio(),
                );
            });
        });
    }
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    group.sample_size(10);
    let bars = sine_wave_series("SPY", 2_500).unwrap();
    let grid = ParameterGrid::parse(&["5, 50, 5", "20, 200, 20"]).unwrap();

    for parallel in [false, true] {
        let optimizer = Optimizer::new(Instrument::parse("SPY"))
            .with_portfolio(portfolio())
            .with_parallelism(parallel);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let _ = optimizer.optimize::<MaCross>(black_box(&bars), &grid);
            });
        });
    }
    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    let grid = ParameterGrid::parse(&["2, 100, 1", "2, 200, 1"]).unwrap();
    c.bench_function("grid_enumeration", |b| {
        b.iter(|| black_box(grid.iter().count()));
    });
}

criterion_group!(benches, bench_single_run, bench_sweep, bench_grid);
criterion_main!(benches);
