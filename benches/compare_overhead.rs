//! Comparison overhead benchmark
//!
//! Measures the cost of one comparison at each stage:
//!
//! 1. Precondition gate alone (identical pair, no workers spawned)
//! 2. Individual tests, called directly without the executor
//! 3. The full battery through the executor (thread per test)
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench compare_overhead
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use histcmp::comparison::{compare, evaluate_gate, CompareOptions};
use histcmp::histogram::Histogram;
use histcmp::metrics::{anderson_darling, chisquare, kolmogorov_smirnov};

/// Peaked histogram with `bins` bins and a shifted mean
fn bench_histogram(bins: usize, shift: f64) -> Histogram {
    let mean = bins as f64 / 2.0 + shift;
    let width = bins as f64 / 6.0;
    let values = (0..bins)
        .map(|i| (1000.0 * (-((i as f64 - mean) / width).powi(2) / 2.0).exp()).round() + 1.0)
        .collect();
    Histogram::new("bench", 0.0, 1.0, values)
}

fn bench_gate(c: &mut Criterion) {
    let h1 = bench_histogram(100, 0.0);
    let h2 = h1.clone();

    c.bench_function("gate_identical", |b| {
        b.iter(|| black_box(evaluate_gate(black_box(&h1), black_box(&h2), 10)));
    });
}

fn bench_individual_tests(c: &mut Criterion) {
    let mut group = c.benchmark_group("tests");

    for bins in [20, 100, 500] {
        let left = bench_histogram(bins, 0.0).bin_values;
        let right = bench_histogram(bins, 0.5).bin_values;

        group.bench_with_input(BenchmarkId::new("chisq", bins), &bins, |b, _| {
            b.iter(|| black_box(chisquare(&left, &right)));
        });
        group.bench_with_input(BenchmarkId::new("KS", bins), &bins, |b, _| {
            b.iter(|| black_box(kolmogorov_smirnov(&left, &right)));
        });
        group.bench_with_input(BenchmarkId::new("AD", bins), &bins, |b, _| {
            b.iter(|| black_box(anderson_darling(&left, &right)));
        });
    }

    group.finish();
}

fn bench_full_battery(c: &mut Criterion) {
    let h1 = bench_histogram(100, 0.0);
    let h2 = bench_histogram(100, 0.5);

    let mut group = c.benchmark_group("battery");
    for (label, options) in [
        ("default", CompareOptions::default()),
        ("legacy", CompareOptions::legacy()),
        ("all", CompareOptions::all()),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| black_box(compare(&h1, &h2, &options)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gate, bench_individual_tests, bench_full_battery);
criterion_main!(benches);
