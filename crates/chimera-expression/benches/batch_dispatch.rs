// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! # Batch Dispatch Benchmarks
//!
//! Compares the dispatch tiers across batch sizes, with caching disabled so
//! every item is computed, and measures the cached hot path separately.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chimera_expression::*;
use chimera_genetics::{loci, Allele, AllelePair, EnvironmentalConditions, Genotype};

fn create_population(size: usize) -> Vec<Genotype> {
    (0..size)
        .map(|i| {
            let effect = (i % 101) as f32 / 100.0;
            Genotype::new(format!("bench-{i}"))
                .with_locus(loci::THC, AllelePair::new(
                    Allele::dominant(format!("t{i}"), effect),
                    Allele::recessive("t-r", 0.4),
                ))
                .with_locus(loci::CBD, AllelePair::homozygous(Allele::recessive(format!("c{i}"), 1.0 - effect)))
                .with_locus(loci::HEIGHT, AllelePair::homozygous(Allele::recessive("h", 0.6)))
                .with_locus(loci::YIELD, AllelePair::homozygous(Allele::recessive("y", 0.7)))
        })
        .collect()
}

fn uncached(strategy_config: ExpressionConfig) -> TraitExpressionEngine {
    TraitExpressionEngine::new(ExpressionConfig {
        enable_caching: false,
        ..strategy_config
    })
}

fn bench_tiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_tiers");
    let env = EnvironmentalConditions::default();

    for (size, label) in [(40, "40"), (500, "500"), (5_000, "5K")] {
        let plants = create_population(size);
        let items: Vec<_> = plants.iter().map(|g| (g, &env)).collect();
        group.throughput(Throughput::Elements(size as u64));

        // Force each tier by moving the thresholds around the batch size
        let sequential = uncached(ExpressionConfig {
            batch_threshold: usize::MAX,
            gpu_threshold: usize::MAX,
            ..ExpressionConfig::deterministic()
        });
        group.bench_with_input(BenchmarkId::new("sequential", label), &items, |b, items| {
            b.iter(|| black_box(sequential.calculate_expression_batch(items)));
        });

        let parallel = uncached(ExpressionConfig {
            batch_threshold: 0,
            use_gpu: false,
            ..ExpressionConfig::deterministic()
        });
        group.bench_with_input(BenchmarkId::new("parallel", label), &items, |b, items| {
            b.iter(|| black_box(parallel.calculate_expression_batch(items)));
        });

        let packed = TraitExpressionEngine::with_accelerator(
            ExpressionConfig {
                enable_caching: false,
                batch_threshold: 0,
                gpu_threshold: 0,
                ..ExpressionConfig::deterministic()
            },
            Box::new(CpuBackend::new()),
        );
        group.bench_with_input(BenchmarkId::new("packed_cpu", label), &items, |b, items| {
            b.iter(|| black_box(packed.calculate_expression_batch(items)));
        });
    }

    group.finish();
}

fn bench_cache_hits(c: &mut Criterion) {
    let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
    let env = EnvironmentalConditions::default();
    let plants = create_population(1_000);
    for g in &plants {
        engine.calculate_expression(g, &env);
    }

    c.bench_function("exact_cache_hit", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let result = engine.calculate_expression(&plants[i % plants.len()], &env);
            i += 1;
            engine.recycle(black_box(result));
        });
    });
}

fn bench_strategy_selection(c: &mut Criterion) {
    let config = ExpressionConfig::default();
    c.bench_function("select_batch_strategy", |b| {
        b.iter(|| black_box(select_batch_strategy(black_box(250), &config, false)));
    });
}

criterion_group!(benches, bench_tiers, bench_cache_hits, bench_strategy_selection);
criterion_main!(benches);
