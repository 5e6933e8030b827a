// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the expression engine front door.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chimera_expression::{ExpressionConfig, TraitExpressionEngine};
use chimera_genetics::{loci, Allele, AllelePair, EnvironmentalConditions, Genotype};

fn plant(id: &str, thc: f32, cbd: f32) -> Genotype {
    Genotype::new(id)
        .with_locus(
            loci::THC,
            AllelePair::new(Allele::dominant(format!("{id}-thc"), thc), Allele::recessive("thc-r", 0.1)),
        )
        .with_locus(
            loci::CBD,
            AllelePair::homozygous(Allele::recessive(format!("{id}-cbd"), cbd)),
        )
        .with_locus(loci::HEIGHT, AllelePair::homozygous(Allele::recessive(format!("{id}-h"), 0.55)))
        .with_locus(loci::YIELD, AllelePair::homozygous(Allele::recessive(format!("{id}-y"), 0.65)))
}

#[test]
fn test_deterministic_without_noise() {
    let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
    let g = plant("det", 0.8, 0.2);
    let env = EnvironmentalConditions::new(22.0, 55.0, 700.0, 1100.0);

    let first = engine.calculate_expression(&g, &env);
    for _ in 0..5 {
        assert_eq!(engine.calculate_expression(&g, &env), first);
    }

    // Same inputs on an engine with caching off must agree with cached values
    let uncached = TraitExpressionEngine::new(ExpressionConfig {
        enable_caching: false,
        ..ExpressionConfig::deterministic()
    });
    assert_eq!(uncached.calculate_expression(&g, &env), first);
}

#[test]
fn test_no_cross_contamination_between_genotypes() {
    let engine = TraitExpressionEngine::new(ExpressionConfig {
        enable_similarity_cache: false,
        ..ExpressionConfig::deterministic()
    });
    let env = EnvironmentalConditions::default();
    let high = plant("high", 0.95, 0.05);
    let low = plant("low", 0.15, 0.85);

    let high_first = engine.calculate_expression(&high, &env);
    let high_snapshot = high_first.clone();
    // Returning the result lets the pool hand the same object to the next call
    engine.recycle(high_first);
    let low_result = engine.calculate_expression(&low, &env);

    assert_eq!(low_result.genotype_id, "low");
    assert_ne!(low_result.thc_expression, high_snapshot.thc_expression);

    // The cached copy of the first genotype is untouched by the reuse
    let high_again = engine.calculate_expression(&high, &env);
    assert_eq!(high_again, high_snapshot);
    assert!(engine.get_performance_metrics().pool.reused >= 1);
}

#[test]
fn test_missing_loci_express_neutral() {
    let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
    let empty = Genotype::new("bare");
    let result = engine.calculate_expression(&empty, &EnvironmentalConditions::default());

    assert_eq!(result.genotype_id, "bare");
    for value in [
        result.height_expression,
        result.thc_expression,
        result.cbd_expression,
        result.yield_expression,
        result.overall_fitness,
    ] {
        assert!((0.0..=1.0).contains(&value));
    }
}

#[test]
fn test_out_of_range_environment_is_clamped() {
    let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
    let g = plant("hot", 0.7, 0.3);
    let absurd = EnvironmentalConditions::new(500.0, -20.0, 1.0e9, f32::NAN);
    let result = engine.calculate_expression(&g, &absurd);

    assert!(result.stress_response.overall_stress_level > 0.0);
    assert!((0.0..=1.0).contains(&result.overall_fitness));
}

#[test]
fn test_metrics_and_clear_cache() {
    let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
    let env = EnvironmentalConditions::default();
    let a = plant("a", 0.9, 0.1);

    engine.calculate_expression(&a, &env);
    engine.calculate_expression(&a, &env);

    let perf = engine.get_performance_metrics();
    assert_eq!(perf.total_calculations, 2);
    assert_eq!(perf.cache_misses, 1);
    assert_eq!(perf.exact_cache_hits, 1);
    assert!((perf.cache_hit_rate - 0.5).abs() < 1e-9);

    let advanced = engine.get_advanced_cache_metrics();
    assert_eq!(advanced.exact.size, 1);
    assert_eq!(advanced.similarity.size, 1);

    engine.clear_cache();
    let cleared = engine.get_advanced_cache_metrics();
    assert_eq!(cleared.exact.size, 0);
    assert_eq!(cleared.similarity.size, 0);
    assert!(cleared.exact.last_cleared.is_some());

    engine.calculate_expression(&a, &env);
    assert_eq!(engine.get_performance_metrics().computations, 2);
}

#[test]
fn test_exact_entries_expire() {
    let mut config = ExpressionConfig {
        enable_similarity_cache: false,
        ..ExpressionConfig::deterministic()
    };
    config.cache.ttl = Duration::from_millis(20);
    let engine = TraitExpressionEngine::new(config);
    let g = plant("ttl", 0.5, 0.5);
    let env = EnvironmentalConditions::default();

    engine.calculate_expression(&g, &env);
    thread::sleep(Duration::from_millis(40));
    engine.calculate_expression(&g, &env);

    let perf = engine.get_performance_metrics();
    assert_eq!(perf.exact_cache_hits, 0);
    assert_eq!(perf.computations, 2);
}

#[test]
fn test_concurrent_callers_share_caches() {
    let engine = Arc::new(TraitExpressionEngine::new(ExpressionConfig::deterministic()));
    let env = EnvironmentalConditions::default();
    let plants: Arc<Vec<Genotype>> =
        Arc::new((0..16).map(|i| plant(&format!("c{i}"), i as f32 / 16.0, 0.3)).collect());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let plants = Arc::clone(&plants);
            thread::spawn(move || {
                for _ in 0..25 {
                    for g in plants.iter() {
                        let r = engine.calculate_expression(g, &env);
                        assert_eq!(r.genotype_id, g.id);
                        engine.recycle(r);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let perf = engine.get_performance_metrics();
    assert_eq!(perf.total_calculations, 4 * 25 * 16);
    assert_eq!(
        perf.exact_cache_hits + perf.similarity_cache_hits + perf.cache_misses,
        perf.total_calculations
    );
}
