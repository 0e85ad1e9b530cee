use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gpts_alloc::{
    budget_allocations, fit_posterior, ExperimentConfig, ExperimentDriver, GpConfig, GptsLearner,
    ResponseCurve, TableEnvironment,
};
use std::hint::black_box;

const LEVELS: [u64; 6] = [0, 1, 3, 5, 8, 10];

fn bench_allocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("budget_allocations");
    for n in [2usize, 3, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(budget_allocations(&LEVELS, 10, n).unwrap()))
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    // 69 arms, observations spread over a third of them.
    let inputs: Vec<Vec<f64>> = (0..69).map(|i| vec![i as f64]).collect();
    let history: Vec<(usize, f64)> = (0..200)
        .map(|t| ((t * 7) % 23 * 3, ((t % 11) as f64) * 0.3))
        .collect();

    let mut group = c.benchmark_group("fit_posterior");
    group.bench_function("fixed_length_scale", |b| {
        let cfg = GpConfig::default();
        b.iter(|| black_box(fit_posterior(&cfg, &inputs, &history).unwrap()))
    });
    group.bench_function("length_scale_grid/5", |b| {
        let cfg = GpConfig {
            length_scale_grid: vec![0.5, 1.0, 2.0, 4.0, 8.0],
            ..GpConfig::default()
        };
        b.iter(|| black_box(fit_posterior(&cfg, &inputs, &history).unwrap()))
    });
    group.finish();
}

fn bench_learner(c: &mut Criterion) {
    c.bench_function("gpts/50_rounds", |b| {
        b.iter(|| {
            let mut l = GptsLearner::with_seed(69, GpConfig::default(), 7).unwrap();
            for t in 0..50 {
                let arm = l.pull_arm();
                let r = if arm == 68 { 5.0 } else { (t % 3) as f64 * 0.1 };
                l.update(arm, r).unwrap();
            }
            black_box(l.best_arm())
        })
    });
}

fn bench_driver(c: &mut Criterion) {
    let cfg = ExperimentConfig {
        n_campaigns: 2,
        horizon: 30,
        n_experiments: 4,
        snapshot_every: Some(0),
        ..ExperimentConfig::default()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    let curves = [
        ResponseCurve { weight: 3.0, scale: 4.0 },
        ResponseCurve { weight: 2.0, scale: 1.0 },
    ];
    c.bench_function("driver/run", |b| {
        b.iter(|| {
            let mut env = TableEnvironment::from_response_curves(driver.allocations(), &curves, 0.5, 1).unwrap();
            black_box(driver.run(&mut env).unwrap())
        })
    });
}

criterion_group!(benches, bench_allocations, bench_fit, bench_learner, bench_driver);
criterion_main!(benches);
