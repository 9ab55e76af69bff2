//! Benchmark for finding deduplication

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swarmaudit_core::{dedupe, dedupe_per_location, Finding, Severity};

const TITLES: [&str; 6] = [
    "Reentrancy",
    "Oracle Manipulation",
    "Missing Access Control",
    "Unchecked Return Value",
    "Timestamp Dependence",
    "Gas Optimization Opportunity",
];

fn batch(n: usize) -> Vec<Finding> {
    (0..n)
        .map(|i| {
            let severity = Severity::KNOWN[i % Severity::KNOWN.len()].clone();
            let title = TITLES[i % TITLES.len()];
            Finding::new(title, severity, format!("contracts/File{}.sol", i % 17), "bench")
                .with_path(format!("contracts/File{}.sol", (i + 3) % 17))
        })
        .collect()
}

fn bench_dedupe_by_title(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedupe_by_title");

    for n in [10, 100, 1000] {
        let findings = batch(n);
        group.bench_with_input(BenchmarkId::new("findings", n), &findings, |b, findings| {
            b.iter(|| dedupe(black_box(findings.clone())))
        });
    }

    group.finish();
}

fn bench_dedupe_per_location(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedupe_per_location");

    for n in [10, 100, 1000] {
        let findings = batch(n);
        group.bench_with_input(BenchmarkId::new("findings", n), &findings, |b, findings| {
            b.iter(|| dedupe_per_location(black_box(findings.clone())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dedupe_by_title, bench_dedupe_per_location);
criterion_main!(benches);
