// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Multi-generation simulation from template founders.

use std::sync::Arc;

use chimera_breeding::*;
use chimera_expression::{ExpressionConfig, TraitExpressionEngine};
use chimera_genetics::random::seeded_rng;
use chimera_genetics::{StrainTemplate, TraitKind};

fn founders(count: usize) -> Vec<chimera_genetics::Genotype> {
    let mut rng = seeded_rng(Some(1234));
    let templates = [
        StrainTemplate::indica_dominant(),
        StrainTemplate::sativa_dominant(),
        StrainTemplate::balanced_hybrid(),
    ];
    (0..count)
        .map(|i| templates[i % templates.len()].create_founder(&mut rng).unwrap())
        .collect()
}

fn engine(config: BreedingConfig) -> BreedingCalculationEngine {
    BreedingCalculationEngine::new(
        BreedingConfig {
            rng_seed: Some(77),
            ..config
        },
        Arc::new(TraitExpressionEngine::new(ExpressionConfig::deterministic())),
    )
}

#[test]
fn test_population_capped_at_founder_count() {
    let engine = engine(BreedingConfig {
        allow_inbreeding: true,
        compatibility_floor: 0.0,
        ..BreedingConfig::default()
    });
    let founders = founders(6);
    let goal = BreedingGoal::new("potency").maximize(TraitKind::Thc, 2.0).maximize(TraitKind::Yield, 1.0);

    let result = engine.simulate_generations(&founders, 4, &goal).unwrap();
    assert_eq!(result.generations_completed(), 4);
    assert_eq!(result.goal_name, "potency");
    for (i, summary) in result.generations.iter().enumerate() {
        assert_eq!(summary.generation, i as u32 + 1);
        assert!(summary.population_size <= founders.len());
        assert_eq!(summary.pairs_bred, 3);
        assert_eq!(summary.offspring_produced, 6);
        assert!((0.0..=1.0).contains(&summary.mean_goal_score));
    }
    assert!(result.final_population.len() <= founders.len());
    assert!(result.best_individual_id.is_some());

    let gain: f32 = result.generations.iter().map(|g| g.genetic_gain).sum();
    assert!((result.total_genetic_gain - gain).abs() < 1e-6);
    let last = result.generations.last().unwrap();
    assert!((result.founder_mean_score + gain - last.mean_goal_score).abs() < 1e-4);
}

#[test]
fn test_simulation_input_validation() {
    let engine = engine(BreedingConfig::default());
    let goal = BreedingGoal::new("thc").maximize(TraitKind::Thc, 1.0);

    assert!(matches!(
        engine.simulate_generations(&founders(1), 3, &goal),
        Err(BreedingError::InsufficientPopulation { required: 2, actual: 1 })
    ));
    assert!(matches!(
        engine.simulate_generations(&founders(4), 3, &BreedingGoal::new("empty")),
        Err(BreedingError::EmptyGoal(_))
    ));
}

#[test]
fn test_zero_generations_returns_founders() {
    let engine = engine(BreedingConfig::default());
    let founders = founders(4);
    let goal = BreedingGoal::new("cbd").maximize(TraitKind::Cbd, 1.0);
    let result = engine.simulate_generations(&founders, 0, &goal).unwrap();
    assert!(result.generations.is_empty());
    assert_eq!(result.final_population, founders);
    assert_eq!(result.total_genetic_gain, 0.0);
}

#[test]
fn test_result_serializes() {
    let engine = engine(BreedingConfig {
        allow_inbreeding: true,
        compatibility_floor: 0.0,
        ..BreedingConfig::default()
    });
    let goal = BreedingGoal::new("yield").maximize(TraitKind::Yield, 1.0);
    let result = engine.simulate_generations(&founders(4), 1, &goal).unwrap();
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"goal_name\":\"yield\""));
}
