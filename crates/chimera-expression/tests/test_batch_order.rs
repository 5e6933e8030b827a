// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Batch output stays index-aligned with input on every dispatch tier.

use chimera_expression::{BatchStrategy, CpuBackend, ExpressionConfig, TraitExpressionEngine};
use chimera_genetics::{loci, Allele, AllelePair, EnvironmentalConditions, Genotype};

fn population(n: usize) -> Vec<Genotype> {
    (0..n)
        .map(|i| {
            let effect = (i % 97) as f32 / 97.0;
            Genotype::new(format!("g{i}"))
                .with_locus(
                    loci::THC,
                    AllelePair::new(
                        Allele::dominant(format!("thc{i}"), effect),
                        Allele::recessive("thc-base", 0.3),
                    ),
                )
                .with_locus(
                    loci::HEIGHT,
                    AllelePair::homozygous(Allele::recessive(format!("h{i}"), 1.0 - effect)),
                )
        })
        .collect()
}

fn environments(n: usize) -> Vec<EnvironmentalConditions> {
    (0..n)
        .map(|i| EnvironmentalConditions::new(15.0 + (i % 20) as f32, 50.0, 500.0 + (i % 7) as f32 * 50.0, 1000.0))
        .collect()
}

fn config() -> ExpressionConfig {
    // L2 answers are approximations; keep comparisons exact
    ExpressionConfig {
        enable_similarity_cache: false,
        ..ExpressionConfig::deterministic()
    }
}

fn assert_aligned(engine: &TraitExpressionEngine, size: usize, expected: BatchStrategy) {
    let plants = population(size);
    let envs = environments(size);
    let items: Vec<_> = plants.iter().zip(envs.iter()).collect();

    assert_eq!(engine.select_batch_strategy(size).strategy, expected);
    let results = engine.calculate_expression_batch(&items);
    assert_eq!(results.len(), size);

    let reference = TraitExpressionEngine::new(ExpressionConfig {
        enable_caching: false,
        ..config()
    });
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.genotype_id, plants[i].id, "index {i}");
        let single = reference.calculate_expression(&plants[i], &envs[i]);
        assert!(
            (single.thc_expression - result.thc_expression).abs() < 1e-5,
            "thc mismatch at index {i}"
        );
        assert!((single.overall_fitness - result.overall_fitness).abs() < 1e-5);
    }
}

#[test]
fn test_sequential_tier_preserves_order() {
    let engine = TraitExpressionEngine::new(config());
    assert_aligned(&engine, 30, BatchStrategy::Sequential);
}

#[test]
fn test_parallel_tier_preserves_order() {
    let engine = TraitExpressionEngine::new(ExpressionConfig {
        use_gpu: false,
        ..config()
    });
    assert_aligned(&engine, 120, BatchStrategy::Parallel);
    assert_aligned(&engine, 400, BatchStrategy::Parallel);
}

#[test]
fn test_accelerated_tier_preserves_order() {
    let engine = TraitExpressionEngine::with_accelerator(config(), Box::new(CpuBackend::new()));
    assert_aligned(&engine, 333, BatchStrategy::Gpu);
    assert_eq!(engine.get_performance_metrics().gpu_batches, 1);
}

#[test]
fn test_accelerated_tier_mixes_cache_hits_and_misses() {
    let engine = TraitExpressionEngine::with_accelerator(config(), Box::new(CpuBackend::new()));
    let plants = population(260);
    let envs = environments(260);
    let items: Vec<_> = plants.iter().zip(envs.iter()).collect();

    // Warm every third item so the packed batch has holes
    for (g, env) in items.iter().step_by(3) {
        engine.calculate_expression(g, env);
    }
    let results = engine.calculate_expression_batch(&items);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.genotype_id, plants[i].id);
    }

    let perf = engine.get_performance_metrics();
    assert_eq!(perf.exact_cache_hits, 87);
    assert_eq!(perf.computations, 260);
}

#[test]
fn test_dedicated_worker_pool() {
    let engine = TraitExpressionEngine::new(ExpressionConfig {
        worker_threads: 2,
        use_gpu: false,
        ..config()
    });
    assert_aligned(&engine, 75, BatchStrategy::Parallel);
}

#[test]
fn test_empty_batch() {
    let engine = TraitExpressionEngine::new(config());
    assert!(engine.calculate_expression_batch(&[]).is_empty());
}
